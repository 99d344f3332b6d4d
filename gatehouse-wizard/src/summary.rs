use gatehouse_core::{AuthMode, ExposureMode, RuntimeConfig};

/// One line per setting, secrets left out.
pub fn summarize(config: &RuntimeConfig) -> String {
    let gateway = &config.gateway;
    let mut lines = vec![
        format!("gateway.mode: {}", gateway.mode),
        format!("gateway.port: {}", gateway.port),
        format!("gateway.bind: {}", gateway.bind),
        format!("gateway.auth: {}", gateway.auth.mode),
    ];
    if gateway.exposure.mode != ExposureMode::Off {
        lines.push(format!(
            "gateway.exposure: {} (reset on exit: {})",
            gateway.exposure.mode, gateway.exposure.reset_on_exit
        ));
    }
    if let Some(remote) = &gateway.remote {
        lines.push(format!("gateway.remote: {}", remote.url));
    }
    if let Some(primary) = &config.model.primary {
        lines.push(format!("model.primary: {primary}"));
    }
    if let Some(workspace) = &config.workspace {
        lines.push(format!("workspace: {}", workspace.display()));
    }
    if !config.auth_profiles.is_empty() {
        let ids: Vec<String> = config
            .auth_profiles
            .iter()
            .map(|p| p.profile_id.to_string())
            .collect();
        lines.push(format!("auth profiles: {}", ids.join(", ")));
    }
    lines.join("\n")
}

/// Credential the Control UI will ask for, if any.
pub fn needs_token(config: &RuntimeConfig) -> bool {
    config.gateway.auth.mode == AuthMode::Token
}
