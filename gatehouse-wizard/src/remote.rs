//! Remote mode: the gateway runs elsewhere; only its address is recorded.

use gatehouse_core::types::{GatewayMode, RemoteGateway};
use gatehouse_core::{Prompter, RuntimeConfig, TextPrompt};

use crate::error::WizardError;

pub fn validate_ws_url(value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        Ok(())
    } else {
        Err("URL must start with ws:// or wss://".to_string())
    }
}

/// Point `config` at a remote gateway. A blank token clears it.
pub fn apply(config: &RuntimeConfig, url: &str, token: &str) -> RuntimeConfig {
    let mut next = config.clone();
    let token = token.trim();
    next.gateway.mode = GatewayMode::Remote;
    next.gateway.remote = Some(RemoteGateway {
        url: url.trim().to_string(),
        token: (!token.is_empty()).then(|| token.to_string()),
    });
    next
}

pub fn collect(config: &RuntimeConfig, prompter: &mut dyn Prompter) -> Result<RuntimeConfig, WizardError> {
    let remote = config.gateway.remote.as_ref();
    let mut url_prompt = TextPrompt::new("Gateway WebSocket URL").validate(validate_ws_url);
    if let Some(existing) = remote {
        url_prompt = url_prompt.initial(existing.url.clone());
    }
    let url = prompter.text(url_prompt)?;
    let token = prompter.text(TextPrompt::new("Gateway token (blank for none)"))?;
    Ok(apply(config, &url, &token))
}
