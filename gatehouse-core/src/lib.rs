//! gatehouse core library: config model, constraint reconciliation, stores.
//!
//! - [`types`]: runtime config and credential records
//! - [`reconcile`]: bind/auth/exposure rules
//! - [`store`]: YAML config snapshot read / atomic write
//! - [`secrets`]: namespaced secure credential store
//! - [`prompt`]: the interactive seam every flow talks to

pub mod docs;
pub mod env;
pub mod error;
pub mod paths;
pub mod prompt;
pub mod reconcile;
pub mod secrets;
pub mod store;
pub mod token;
pub mod types;

pub use env::ProcessEnv;
pub use error::{ConfigError, InvariantViolation};
pub use prompt::{Choice, PromptError, Prompter, TextPrompt};
pub use reconcile::{reconcile, Correction, GatewayProposal, Reconciled};
pub use secrets::{KeyringStore, MemorySecretStore, SecretStore};
pub use store::{ConfigIssue, ConfigSnapshot};
pub use types::{
    AuthMode, AuthProfile, BindMode, Credential, CredentialMode, ExposureMode, GatewayMode,
    ModelConfig, ProfileId, RuntimeConfig,
};
