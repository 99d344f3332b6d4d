//! Control UI addresses shown at the end of the wizard.

use gatehouse_core::BindMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlUiLinks {
    pub http_url: String,
    pub ws_url: String,
}

/// Links for a gateway bound per `bind` on `port`. Non-loopback binds use
/// `host` when known (e.g. the machine's LAN name), else loopback.
pub fn control_ui_links(bind: BindMode, port: u16, host: Option<&str>) -> ControlUiLinks {
    let host = match bind {
        BindMode::Loopback => "127.0.0.1",
        BindMode::Lan | BindMode::Tailnet | BindMode::Auto => {
            host.map(str::trim).filter(|h| !h.is_empty()).unwrap_or("127.0.0.1")
        }
    };
    ControlUiLinks {
        http_url: format!("http://{host}:{port}/"),
        ws_url: format!("ws://{host}:{port}"),
    }
}

/// How to reach a loopback-only UI from another machine.
pub fn ssh_tunnel_hint(port: u16, token_auth: bool) -> String {
    let mut lines = vec![
        "No browser available here. From your own machine, run:".to_string(),
        format!("ssh -N -L {port}:127.0.0.1:{port} <user>@<this-host>"),
        format!("Then open http://localhost:{port}/"),
    ];
    if token_auth {
        lines.push("Sign in with the gateway token from your config.".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_ignores_host() {
        let links = control_ui_links(BindMode::Loopback, 18789, Some("studio.local"));
        assert_eq!(links.http_url, "http://127.0.0.1:18789/");
        assert_eq!(links.ws_url, "ws://127.0.0.1:18789");
    }

    #[test]
    fn lan_uses_host_when_known() {
        let links = control_ui_links(BindMode::Lan, 19000, Some("studio.local"));
        assert_eq!(links.http_url, "http://studio.local:19000/");
        let fallback = control_ui_links(BindMode::Lan, 19000, None);
        assert_eq!(fallback.ws_url, "ws://127.0.0.1:19000");
    }

    #[test]
    fn ssh_hint_names_port() {
        let hint = ssh_tunnel_hint(18789, true);
        assert!(hint.contains("-L 18789:127.0.0.1:18789"));
        assert!(hint.contains("gateway token"));
    }
}
