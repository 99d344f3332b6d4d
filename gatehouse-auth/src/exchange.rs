//! Token-exchange step of the OAuth handshake.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::AuthError;
use crate::provider::TokenBody;

/// One token-endpoint call. Parameters carry the code and verifier, so
/// `Debug` prints the endpoint only.
#[derive(Clone)]
pub struct TokenRequest {
    pub token_url: String,
    pub body: TokenBody,
    pub params: Vec<(String, String)>,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("token_url", &self.token_url)
            .field("body", &self.body)
            .field("params", &format_args!("[{} redacted]", self.params.len()))
            .finish()
    }
}

impl TokenRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Tokens returned by a successful exchange.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<u64>,
    /// Account identity reported by the provider (email), if any.
    pub identity: Option<String>,
}

#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, request: TokenRequest) -> Result<TokenSet, AuthError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// `ureq`-backed exchanger; the blocking call runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct HttpTokenExchanger {
    timeout: Duration,
}

impl Default for HttpTokenExchanger {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpTokenExchanger {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, request: TokenRequest) -> Result<TokenSet, AuthError> {
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || post_token_request(&request, timeout))
            .await
            .map_err(|e| AuthError::Exchange(format!("exchange task failed: {e}")))?
    }
}

fn post_token_request(request: &TokenRequest, timeout: Duration) -> Result<TokenSet, AuthError> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let call = agent
        .post(&request.token_url)
        .set("Accept", "application/json");

    let result = match request.body {
        TokenBody::Json => {
            let body: serde_json::Map<String, serde_json::Value> = request
                .params
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            call.send_json(serde_json::Value::Object(body))
        }
        TokenBody::Form => {
            let pairs: Vec<(&str, &str)> = request
                .params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            call.send_form(&pairs)
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            return Err(AuthError::Exchange(format!(
                "HTTP {code}: {}",
                truncate(&body, 300)
            )));
        }
        Err(err) => return Err(AuthError::Exchange(err.to_string())),
    };

    let raw: RawTokenResponse = response
        .into_json()
        .map_err(|e| AuthError::Exchange(format!("invalid token response: {e}")))?;
    tracing::debug!(url = %request.token_url, "token exchange succeeded");
    Ok(raw.into_token_set())
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    account: Option<RawAccount>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    email_address: Option<String>,
}

impl RawTokenResponse {
    fn into_token_set(self) -> TokenSet {
        let identity = self
            .email
            .or_else(|| self.account.and_then(|a| a.email_address))
            .or_else(|| self.id_token.as_deref().and_then(email_from_id_token));
        TokenSet {
            access_token: SecretString::new(self.access_token.into()),
            refresh_token: self.refresh_token.map(|t| SecretString::new(t.into())),
            expires_in: self.expires_in,
            identity,
        }
    }
}

/// `email` claim of an unverified JWT payload. Only used as a label.
pub fn email_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("email")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn identity_prefers_explicit_email_then_account_then_jwt() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"email":"jwt@example.com"}"#);
        let jwt = format!("h.{payload}.s");

        let raw: RawTokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "at",
            "account": {"email_address": "acct@example.com"},
            "id_token": jwt,
        }))
        .expect("json");
        let set = raw.into_token_set();
        assert_eq!(set.identity.as_deref(), Some("acct@example.com"));
        assert_eq!(set.access_token.expose_secret(), "at");

        assert_eq!(email_from_id_token(&jwt).as_deref(), Some("jwt@example.com"));
        assert_eq!(email_from_id_token("not-a-jwt"), None);
    }

    #[test]
    fn debug_output_hides_params() {
        let req = TokenRequest {
            token_url: "https://example.com/token".into(),
            body: TokenBody::Form,
            params: vec![("code".into(), "super-secret".into())],
        };
        let printed = format!("{req:?}");
        assert!(!printed.contains("super-secret"));
        assert_eq!(req.param("code"), Some("super-secret"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
