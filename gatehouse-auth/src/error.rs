use gatehouse_core::PromptError;
use thiserror::Error;

/// Errors from authorization flows. None of them leave partial state behind.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization cancelled")]
    Cancelled,

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("no OAuth client id configured for {provider}; set {env_var}")]
    MissingClientId {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("could not build authorize URL: {0}")]
    AuthorizeUrl(#[from] url::ParseError),

    #[error("authorization input did not contain a code")]
    MissingCode,

    #[error("OAuth state mismatch; restart the sign-in")]
    StateMismatch,

    #[error("provider returned an error: {0}")]
    ProviderDenied(String),

    #[error("callback listener error: {0}")]
    Callback(String),

    #[error("timed out waiting for the browser callback")]
    CallbackTimeout,

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("secure credential store rejected the write for {account}")]
    SecretStore { account: String },
}

impl AuthError {
    /// Failures caused by an external service (vs. the user or local input).
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            AuthError::ProviderDenied(_)
                | AuthError::Callback(_)
                | AuthError::CallbackTimeout
                | AuthError::Exchange(_)
                | AuthError::StateMismatch
                | AuthError::SecretStore { .. }
        )
    }
}

impl From<PromptError> for AuthError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => AuthError::Cancelled,
            PromptError::Backend(message) => AuthError::Prompt(message),
        }
    }
}
