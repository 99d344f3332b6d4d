//! The two-channel OAuth flow shared by every OAuth provider.
//!
//! Authorize channel: build the URL, then either open a browser (local) or
//! print it for another device and collect the pasted result right away
//! (remote). Resume channel, in precedence order:
//!
//! 1. a paste already collected on the authorize channel
//! 2. the loopback callback, when the provider redirects to one
//! 3. a manual paste prompt
//!
//! A pending paste short-circuits the callback wait, so the user is never
//! asked twice for the same code.

use std::time::Duration;

use chrono::Utc;
use gatehouse_core::prompt::validate_required;
use gatehouse_core::{Credential, CredentialMode, ProcessEnv, Prompter, TextPrompt};
use secrecy::{ExposeSecret, SecretString};

use crate::callback::{parse_authorization_input, AuthorizationInput, CallbackListener};
use crate::error::AuthError;
use crate::exchange::{TokenExchanger, TokenRequest, TokenSet};
use crate::opener::UrlOpener;
use crate::pkce::{random_state, Pkce};
use crate::provider::{CallbackShape, ProviderSpec, TokenBody};

pub struct OAuthFlow<'a> {
    pub spec: &'a ProviderSpec,
    pub env: &'a ProcessEnv,
    pub exchanger: &'a dyn TokenExchanger,
    pub opener: &'a dyn UrlOpener,
    /// The user cannot see a browser opened on this machine.
    pub remote: bool,
    pub callback_timeout: Duration,
}

/// A redirect captured on the listener must echo the state we sent.
fn captured_input(
    input: AuthorizationInput,
    expected_state: &str,
) -> Result<AuthorizationInput, AuthError> {
    match input.state.as_deref() {
        Some(returned) if returned == expected_state => Ok(input),
        _ => Err(AuthError::StateMismatch),
    }
}

/// A pasted raw code carries no state; when one is present it must match.
fn pasted_input(pasted: &str, expected_state: &str) -> Result<AuthorizationInput, AuthError> {
    let input = parse_authorization_input(pasted)?;
    match input.state.as_deref() {
        Some(returned) if returned != expected_state => Err(AuthError::StateMismatch),
        _ => Ok(input),
    }
}

impl OAuthFlow<'_> {
    pub async fn run(&self, prompter: &mut dyn Prompter) -> Result<Credential, AuthError> {
        let client_id = self.spec.client_id(self.env)?;
        let pkce = Pkce::generate();
        let state = random_state();
        let url = self.spec.authorize_url(&client_id, &pkce, &state)?;

        prompter.note(self.spec.title, &self.spec.intro(self.remote));

        // Listen before the URL is shown so a fast redirect is not lost.
        let listener = self.bind_listener().await;

        let mut pending_paste = None;
        if self.remote {
            prompter.log(&format!("\nOpen this URL in your LOCAL browser:\n\n{url}\n"));
            pending_paste = Some(prompter.text(self.paste_prompt())?);
        } else {
            if let Err(err) = self.opener.open(url.as_str()) {
                tracing::debug!(provider = self.spec.id, error = %err, "could not open browser");
            }
            prompter.log(&format!("Open: {url}"));
        }

        let input = self.resume(pending_paste, listener, prompter, &state).await?;

        let request = self.token_request(&client_id, &pkce, &state, &input);
        let tokens = self.exchanger.exchange(request).await?;
        tracing::info!(provider = self.spec.id, "oauth exchange complete");
        Ok(self.credential(tokens))
    }

    async fn bind_listener(&self) -> Option<CallbackListener> {
        let CallbackShape::LocalServer { port, path } = self.spec.callback else {
            return None;
        };
        match CallbackListener::bind(port, path).await {
            Ok(listener) => Some(listener),
            Err(err) => {
                tracing::warn!(provider = self.spec.id, error = %err, "callback capture unavailable");
                None
            }
        }
    }

    async fn resume(
        &self,
        pending_paste: Option<String>,
        listener: Option<CallbackListener>,
        prompter: &mut dyn Prompter,
        expected_state: &str,
    ) -> Result<AuthorizationInput, AuthError> {
        if let Some(pasted) = pending_paste {
            return pasted_input(&pasted, expected_state);
        }

        if let Some(listener) = listener {
            prompter.log("Complete sign-in in browser…");
            match listener.wait(self.callback_timeout).await {
                Ok(input) => return captured_input(input, expected_state),
                Err(AuthError::CallbackTimeout) => {
                    prompter.log("No browser callback received; paste the redirect URL instead.");
                }
                Err(AuthError::Callback(err)) => {
                    tracing::warn!(provider = self.spec.id, error = %err, "callback capture failed");
                }
                Err(err) => return Err(err),
            }
        }

        let pasted = prompter.text(self.paste_prompt())?;
        pasted_input(&pasted, expected_state)
    }

    fn paste_prompt(&self) -> TextPrompt {
        let message = match self.spec.callback {
            CallbackShape::ManualCode => "Paste authorization code (code#state)",
            CallbackShape::LocalServer { .. } => "Paste the redirect URL (or authorization code)",
        };
        TextPrompt::new(message).validate(validate_required)
    }

    fn token_request(
        &self,
        client_id: &str,
        pkce: &Pkce,
        state: &str,
        input: &AuthorizationInput,
    ) -> TokenRequest {
        let mut params = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), input.code.clone()),
            ("redirect_uri".to_string(), self.spec.redirect_uri.to_string()),
            ("client_id".to_string(), client_id.to_string()),
            ("code_verifier".to_string(), pkce.verifier().to_string()),
        ];
        if self.spec.token_body == TokenBody::Json {
            params.push(("state".to_string(), state.to_string()));
        }
        if let Some(secret) = self.spec.client_secret(self.env) {
            params.push(("client_secret".to_string(), secret));
        }
        TokenRequest {
            token_url: self.spec.token_url.to_string(),
            body: self.spec.token_body,
            params,
        }
    }

    fn credential(&self, tokens: TokenSet) -> Credential {
        let expires_at = tokens
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        let material = serde_json::json!({
            "access_token": tokens.access_token.expose_secret(),
            "refresh_token": tokens.refresh_token.as_ref().map(|t| t.expose_secret().to_string()),
            "expires_at": expires_at,
        });
        Credential {
            provider: self.spec.id.to_string(),
            mode: CredentialMode::OAuth,
            secret: SecretString::new(material.to_string().into()),
            identity_hint: tokens.identity,
        }
    }
}
