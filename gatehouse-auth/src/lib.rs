//! Provider authorization flows for gatehouse.
//!
//! [`AuthFlowRunner`] turns one [`AuthChoice`] into either an updated
//! [`gatehouse_core::RuntimeConfig`] (credential in the secret store, profile
//! descriptor in the config) or an error that left both untouched.

pub mod callback;
pub mod choice;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod opener;
pub mod pkce;
pub mod provider;
pub mod runner;

pub use choice::AuthChoice;
pub use error::AuthError;
pub use exchange::{HttpTokenExchanger, TokenExchanger, TokenRequest, TokenSet};
pub use opener::{SystemOpener, UrlOpener};
pub use provider::ProviderSpec;
pub use runner::{prompt_auth_choice, prompt_default_model, AuthApplied, AuthFlowRunner, ModelSelection};
