//! Health section and the reachability hint on the mode question.

use async_trait::async_trait;
use gatehouse_core::{docs, ProcessEnv, Prompter, RuntimeConfig};
use gatehouse_daemon::{GatewayProbe, HealthStatus};

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, config: &RuntimeConfig) -> HealthStatus;
}

/// Checks the locally configured gateway over HTTP.
#[derive(Debug, Clone)]
pub struct ProbeHealthCheck {
    pub env: ProcessEnv,
}

#[async_trait]
impl HealthCheck for ProbeHealthCheck {
    async fn check(&self, config: &RuntimeConfig) -> HealthStatus {
        GatewayProbe::for_config(config, &self.env).probe().await
    }
}

pub fn describe(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "gateway is healthy".to_string(),
        HealthStatus::Unauthorized => "gateway refused the configured credential".to_string(),
        HealthStatus::Degraded(detail) => format!("gateway answered but is degraded: {detail}"),
        HealthStatus::Unreachable(detail) => format!("gateway unreachable: {detail}"),
    }
}

/// Report `status`; anything but healthy gets the help note.
pub fn report(status: &HealthStatus, prompter: &mut dyn Prompter) {
    if status.is_healthy() {
        prompter.log("Health check passed.");
        return;
    }
    tracing::warn!(status = ?status, "health check failed");
    prompter.error(&format!("Health check failed: {}", describe(status)));
    prompter.note(
        "Health check help",
        &format!("Docs:\n{}\n{}", docs::HEALTH, docs::TROUBLESHOOTING),
    );
}
