//! Per-provider OAuth parameters.
//!
//! Every OAuth provider runs through the same [`crate::flow::OAuthFlow`]; the
//! differences (endpoints, scopes, how the code comes back) live here.

use gatehouse_core::ProcessEnv;
use url::Url;

use crate::error::AuthError;
use crate::pkce::Pkce;

/// How the authorization code comes back to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackShape {
    /// Provider shows `code#state` on its own page; the user pastes it.
    ManualCode,
    /// Provider redirects the browser to a fixed loopback port.
    LocalServer { port: u16, path: &'static str },
}

/// Encoding of the token-exchange request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBody {
    Json,
    Form,
}

#[derive(Debug, Clone)]
pub struct ProviderSpec {
    /// Provider key used in profile ids and secret-store accounts.
    pub id: &'static str,
    pub title: &'static str,
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub redirect_uri: &'static str,
    pub scopes: &'static [&'static str],
    pub extra_authorize_params: &'static [(&'static str, &'static str)],
    pub client_id_env: &'static str,
    pub default_client_id: Option<&'static str>,
    pub client_secret_env: Option<&'static str>,
    pub callback: CallbackShape,
    pub token_body: TokenBody,
    /// Model applied when the user has not picked one yet.
    pub default_model: Option<&'static str>,
    pub local_note: &'static [&'static str],
    pub remote_note: &'static [&'static str],
}

pub const ANTHROPIC: ProviderSpec = ProviderSpec {
    id: "anthropic",
    title: "Anthropic OAuth",
    authorize_url: "https://claude.ai/oauth/authorize",
    token_url: "https://console.anthropic.com/v1/oauth/token",
    redirect_uri: "https://console.anthropic.com/oauth/code/callback",
    scopes: &["org:create_api_key", "user:profile", "user:inference"],
    extra_authorize_params: &[("code", "true")],
    client_id_env: "GATEHOUSE_ANTHROPIC_CLIENT_ID",
    default_client_id: Some("9d1c250a-e61b-44d9-88ed-5944d1962f5e"),
    client_secret_env: None,
    callback: CallbackShape::ManualCode,
    token_body: TokenBody::Json,
    default_model: None,
    local_note: &["Browser will open. Paste the code shown after login (code#state)."],
    remote_note: &[
        "Open the URL below in a browser on any device.",
        "After login, paste the code shown (code#state) back here.",
    ],
};

pub const OPENAI_CODEX: ProviderSpec = ProviderSpec {
    id: "openai-codex",
    title: "OpenAI Codex OAuth",
    authorize_url: "https://auth.openai.com/oauth/authorize",
    token_url: "https://auth.openai.com/oauth/token",
    redirect_uri: "http://localhost:1455/auth/callback",
    scopes: &["openid", "profile", "email", "offline_access"],
    extra_authorize_params: &[
        ("id_token_add_organizations", "true"),
        ("codex_cli_simplified_flow", "true"),
    ],
    client_id_env: "GATEHOUSE_OPENAI_CODEX_CLIENT_ID",
    default_client_id: Some("app_EMoamEEZ73f0CkXaXp7hrann"),
    client_secret_env: None,
    callback: CallbackShape::LocalServer {
        port: 1455,
        path: "/auth/callback",
    },
    token_body: TokenBody::Form,
    default_model: Some("openai-codex/gpt-5.1-codex"),
    local_note: &[
        "Browser will open for OpenAI authentication.",
        "If the callback doesn't auto-complete, paste the redirect URL.",
        "OpenAI OAuth uses localhost:1455 for the callback.",
    ],
    remote_note: &[
        "You are running in a remote/VPS environment.",
        "A URL will be shown for you to open in your LOCAL browser.",
        "After signing in, paste the redirect URL back here.",
    ],
};

pub const GOOGLE_ANTIGRAVITY: ProviderSpec = ProviderSpec {
    id: "google-antigravity",
    title: "Google Antigravity OAuth",
    authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    redirect_uri: "http://localhost:51121/oauth-callback",
    scopes: &[
        "https://www.googleapis.com/auth/cloud-platform",
        "https://www.googleapis.com/auth/userinfo.email",
        "https://www.googleapis.com/auth/userinfo.profile",
    ],
    extra_authorize_params: &[("access_type", "offline"), ("prompt", "consent")],
    client_id_env: "GATEHOUSE_ANTIGRAVITY_CLIENT_ID",
    default_client_id: None,
    client_secret_env: Some("GATEHOUSE_ANTIGRAVITY_CLIENT_SECRET"),
    callback: CallbackShape::LocalServer {
        port: 51121,
        path: "/oauth-callback",
    },
    token_body: TokenBody::Form,
    default_model: Some("google-antigravity/claude-opus-4-5-thinking"),
    local_note: &[
        "Browser will open for Google authentication.",
        "Sign in with your Google account that has Antigravity access.",
        "The callback will be captured automatically on localhost:51121.",
    ],
    remote_note: &[
        "You are running in a remote/VPS environment.",
        "A URL will be shown for you to open in your LOCAL browser.",
        "After signing in, copy the redirect URL and paste it back here.",
    ],
};

impl ProviderSpec {
    /// Client id from `client_id_env`, falling back to the built-in default.
    pub fn client_id(&self, env: &ProcessEnv) -> Result<String, AuthError> {
        env.get(self.client_id_env)
            .map(str::to_string)
            .or_else(|| self.default_client_id.map(str::to_string))
            .ok_or(AuthError::MissingClientId {
                provider: self.id,
                env_var: self.client_id_env,
            })
    }

    pub fn client_secret(&self, env: &ProcessEnv) -> Option<String> {
        self.client_secret_env
            .and_then(|key| env.get(key))
            .map(str::to_string)
    }

    pub fn authorize_url(
        &self,
        client_id: &str,
        pkce: &Pkce,
        state: &str,
    ) -> Result<Url, AuthError> {
        let mut url = Url::parse(self.authorize_url)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.extra_authorize_params {
                query.append_pair(key, value);
            }
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", client_id)
                .append_pair("redirect_uri", self.redirect_uri)
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("code_challenge", pkce.challenge())
                .append_pair("code_challenge_method", "S256")
                .append_pair("state", state);
        }
        Ok(url)
    }

    /// Intro note body shown before the flow starts.
    pub fn intro(&self, remote: bool) -> String {
        let lines = if remote {
            self.remote_note
        } else {
            self.local_note
        };
        lines.join("\n")
    }
}
