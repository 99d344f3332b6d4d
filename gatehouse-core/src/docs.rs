//! Documentation links shown next to every external-service failure.

pub const OAUTH_FAQ: &str = "https://docs.gatehouse.dev/start/faq";
pub const CONFIGURATION: &str = "https://docs.gatehouse.dev/gateway/configuration";
pub const TAILSCALE: &str = "https://docs.gatehouse.dev/gateway/tailscale";
pub const WEB: &str = "https://docs.gatehouse.dev/web";
pub const DAEMON: &str = "https://docs.gatehouse.dev/gateway/daemon";
pub const LINGER: &str = "https://docs.gatehouse.dev/gateway/linux-linger";
pub const HEALTH: &str = "https://docs.gatehouse.dev/gateway/health";
pub const TROUBLESHOOTING: &str = "https://docs.gatehouse.dev/gateway/troubleshooting";
pub const CONTROL_UI: &str = "https://docs.gatehouse.dev/web/control-ui";
pub const PAIRING: &str = "https://docs.gatehouse.dev/nodes/pairing";
