//! Best-effort post-install check of the gateway port.
//!
//! Sends `GET /health` (with a bearer credential when one is known) and
//! classifies the status code. Never fails; callers report non-healthy
//! results with a docs link and carry on.

use std::time::Duration;

use gatehouse_core::types::{AuthMode, RuntimeConfig};
use gatehouse_core::ProcessEnv;
use secrecy::{ExposeSecret, SecretString};

pub const ENV_GATEWAY_PASSWORD: &str = "GATEHOUSE_GATEWAY_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Listening, but the credential was refused or missing.
    Unauthorized,
    /// Listening, but the answer was not a 2xx.
    Degraded(String),
    Unreachable(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayProbe {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub auth: Option<SecretString>,
}

impl GatewayProbe {
    /// Check for the locally configured gateway. Credentials come from the
    /// config, falling back to `GATEHOUSE_GATEWAY_TOKEN` / `_PASSWORD`.
    pub fn for_config(config: &RuntimeConfig, env: &ProcessEnv) -> Self {
        let auth = &config.gateway.auth;
        let secret = match auth.mode {
            AuthMode::Off => None,
            AuthMode::Token => auth
                .token
                .clone()
                .or_else(|| env.get(crate::launch::ENV_GATEWAY_TOKEN).map(str::to_string)),
            AuthMode::Password => auth
                .password
                .clone()
                .or_else(|| env.get(ENV_GATEWAY_PASSWORD).map(str::to_string)),
        };
        Self {
            host: "127.0.0.1".to_string(),
            port: config.gateway.port,
            timeout: Duration::from_secs(3),
            auth: secret.map(|s| SecretString::new(s.into())),
        }
    }

    fn url(&self) -> String {
        format!("http://{}:{}/health", self.host, self.port)
    }

    /// The blocking request runs on tokio's blocking pool.
    pub async fn probe(&self) -> HealthStatus {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.get_health()).await {
            Ok(status) => status,
            Err(err) => HealthStatus::Unreachable(format!("health check task failed: {err}")),
        }
    }

    fn get_health(&self) -> HealthStatus {
        let agent = ureq::AgentBuilder::new()
            .timeout(self.timeout)
            .redirects(0)
            .build();
        let mut request = agent.get(&self.url());
        if let Some(secret) = &self.auth {
            request = request.set("Authorization", &format!("Bearer {}", secret.expose_secret()));
        }

        let status = match request.call() {
            Ok(response) => classify(response.status()),
            Err(ureq::Error::Status(code, _)) => classify(code),
            Err(ureq::Error::Transport(err)) => match err.kind() {
                ureq::ErrorKind::BadStatus | ureq::ErrorKind::BadHeader => {
                    HealthStatus::Degraded(format!("non-HTTP reply: {err}"))
                }
                _ => HealthStatus::Unreachable(format!("{}:{}: {err}", self.host, self.port)),
            },
        };
        tracing::debug!(host = %self.host, port = self.port, ?status, "gateway health checked");
        status
    }
}

fn classify(code: u16) -> HealthStatus {
    match code {
        200..=299 => HealthStatus::Healthy,
        401 | 403 => HealthStatus::Unauthorized,
        other => HealthStatus::Degraded(format!("HTTP {other}")),
    }
}
