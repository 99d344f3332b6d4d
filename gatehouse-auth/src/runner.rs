//! AuthFlowRunner: one credential-or-skip outcome per wizard run.
//!
//! Commit order on success is secret store first, then the profile
//! descriptor on a copy of the config. Any error before that point leaves
//! both stores exactly as they were.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::secrets::AUTH_NAMESPACE;
use gatehouse_core::types::ProviderEndpoint;
use gatehouse_core::{
    docs, AuthProfile, Credential, CredentialMode, ProcessEnv, Prompter, RuntimeConfig,
    SecretStore, TextPrompt,
};
use secrecy::SecretString;

use crate::choice::AuthChoice;
use crate::error::AuthError;
use crate::exchange::TokenExchanger;
use crate::flow::OAuthFlow;
use crate::opener::UrlOpener;
use crate::provider::{ProviderSpec, ANTHROPIC, GOOGLE_ANTIGRAVITY, OPENAI_CODEX};

pub const LMSTUDIO_PROVIDER: &str = "lmstudio";
pub const LMSTUDIO_BASE_URL: &str = "http://127.0.0.1:1234/v1";
pub const LMSTUDIO_MODEL: &str = "minimax-m2.1-gs32";

const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(180);

/// Run-scoped "who set the default model" latch.
///
/// The first writer in a run (an explicit user choice, or a provider
/// default) wins. A primary model already present in the config counts as a
/// prior writer.
#[derive(Debug, Clone, Default)]
pub struct ModelSelection {
    chosen: Option<String>,
}

impl ModelSelection {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            chosen: config.model.primary.clone(),
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.chosen.as_deref()
    }

    /// Apply a provider's recommended model unless something already won.
    pub fn apply_default(&mut self, config: &mut RuntimeConfig, model: &str) -> bool {
        if self.chosen.is_some() || config.model.primary.is_some() {
            return false;
        }
        config.set_primary_model(model);
        self.chosen = Some(model.to_string());
        true
    }

    /// The user typed a model; that always wins.
    pub fn record_explicit(&mut self, config: &mut RuntimeConfig, model: &str) {
        config.set_primary_model(model);
        self.chosen = Some(model.to_string());
    }
}

/// Successful outcome of [`AuthFlowRunner::run`].
#[derive(Debug, Clone)]
pub struct AuthApplied {
    pub config: RuntimeConfig,
    /// Profile written, if the choice produced a credential.
    pub profile: Option<AuthProfile>,
    pub notices: Vec<String>,
}

pub struct AuthFlowRunner {
    secrets: Arc<dyn SecretStore>,
    exchanger: Arc<dyn TokenExchanger>,
    opener: Arc<dyn UrlOpener>,
    env: ProcessEnv,
    remote: bool,
    callback_timeout: Duration,
}

impl AuthFlowRunner {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        exchanger: Arc<dyn TokenExchanger>,
        opener: Arc<dyn UrlOpener>,
        env: ProcessEnv,
    ) -> Self {
        let remote = env.is_remote();
        Self {
            secrets,
            exchanger,
            opener,
            env,
            remote,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
        }
    }

    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Resolve `choice` against `config`.
    ///
    /// Returns the next config on success. On failure the error has already
    /// been shown to the user (with a docs link) and `config` is untouched.
    pub async fn run(
        &self,
        choice: AuthChoice,
        config: &RuntimeConfig,
        selection: &mut ModelSelection,
        prompter: &mut dyn Prompter,
    ) -> Result<AuthApplied, AuthError> {
        let result = self.resolve(choice, config, selection, prompter).await;
        if let Err(err) = &result {
            match err {
                AuthError::Cancelled => {
                    tracing::info!(choice = %choice, "authorization cancelled");
                    prompter.log("Authorization cancelled; existing credentials kept.");
                }
                err => {
                    tracing::warn!(choice = %choice, error = %err, "authorization failed");
                    prompter.error(&err.to_string());
                    prompter.note(
                        "OAuth",
                        &format!("Trouble with OAuth? See {}", docs::OAUTH_FAQ),
                    );
                }
            }
        }
        result
    }

    async fn resolve(
        &self,
        choice: AuthChoice,
        config: &RuntimeConfig,
        selection: &mut ModelSelection,
        prompter: &mut dyn Prompter,
    ) -> Result<AuthApplied, AuthError> {
        let mut next = config.clone();
        let mut notices = Vec::new();

        let profile = match choice {
            AuthChoice::AnthropicOAuth => {
                Some(self.oauth(&ANTHROPIC, &mut next, selection, &mut notices, prompter).await?)
            }
            AuthChoice::OpenAiCodexOAuth => Some(
                self.oauth(&OPENAI_CODEX, &mut next, selection, &mut notices, prompter)
                    .await?,
            ),
            AuthChoice::GoogleAntigravityOAuth => Some(
                self.oauth(&GOOGLE_ANTIGRAVITY, &mut next, selection, &mut notices, prompter)
                    .await?,
            ),
            AuthChoice::AnthropicApiKey => {
                let key = prompter.password("Enter Anthropic API key")?;
                let credential = Credential {
                    provider: ANTHROPIC.id.to_string(),
                    mode: CredentialMode::ApiKey,
                    secret: SecretString::new(key.trim().to_string().into()),
                    identity_hint: None,
                };
                Some(self.commit(&mut next, &credential)?)
            }
            AuthChoice::LmStudio => {
                next.providers.insert(
                    LMSTUDIO_PROVIDER.to_string(),
                    ProviderEndpoint {
                        base_url: LMSTUDIO_BASE_URL.to_string(),
                        models: vec![LMSTUDIO_MODEL.to_string()],
                    },
                );
                let model = format!("{LMSTUDIO_PROVIDER}/{LMSTUDIO_MODEL}");
                if selection.apply_default(&mut next, &model) {
                    notices.push(format!("Default model set to {model}"));
                }
                None
            }
            AuthChoice::Skip => None,
        };

        for notice in &notices {
            prompter.note("Model configured", notice);
        }
        Ok(AuthApplied {
            config: next,
            profile,
            notices,
        })
    }

    async fn oauth(
        &self,
        spec: &ProviderSpec,
        next: &mut RuntimeConfig,
        selection: &mut ModelSelection,
        notices: &mut Vec<String>,
        prompter: &mut dyn Prompter,
    ) -> Result<AuthProfile, AuthError> {
        let flow = OAuthFlow {
            spec,
            env: &self.env,
            exchanger: self.exchanger.as_ref(),
            opener: self.opener.as_ref(),
            remote: self.remote,
            callback_timeout: self.callback_timeout,
        };
        let credential = flow.run(prompter).await?;
        let profile = self.commit(next, &credential)?;
        if let Some(model) = spec.default_model {
            if selection.apply_default(next, model) {
                notices.push(format!("Default model set to {model}"));
            }
        }
        Ok(profile)
    }

    /// Secret first; the profile is only recorded once the secret is stored.
    fn commit(
        &self,
        next: &mut RuntimeConfig,
        credential: &Credential,
    ) -> Result<AuthProfile, AuthError> {
        let profile = credential.profile();
        let account = profile.profile_id.to_string();
        if !self.secrets.save(AUTH_NAMESPACE, &account, &credential.secret) {
            return Err(AuthError::SecretStore { account });
        }
        next.upsert_auth_profile(profile.clone());
        tracing::info!(profile = %profile.profile_id, mode = %profile.mode, "auth profile stored");
        Ok(profile)
    }
}

/// Final "Default model (blank to keep)" prompt.
pub fn prompt_default_model(
    config: &mut RuntimeConfig,
    selection: &mut ModelSelection,
    prompter: &mut dyn Prompter,
) -> Result<(), AuthError> {
    let mut prompt = TextPrompt::new("Default model (blank to keep)");
    if let Some(current) = config.model.primary.as_deref() {
        prompt = prompt.initial(current);
    }
    let model = prompter.text(prompt)?;
    let model = model.trim();
    if !model.is_empty() {
        selection.record_explicit(config, model);
    }
    Ok(())
}

/// Prompt for the auth choice itself.
pub fn prompt_auth_choice(prompter: &mut dyn Prompter) -> Result<AuthChoice, AuthError> {
    let value = prompter.select("Model/auth choice", &AuthChoice::choices(), None)?;
    value.parse().map_err(AuthError::Prompt)
}
