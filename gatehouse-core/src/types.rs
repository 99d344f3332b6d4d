//! Domain types for the gatehouse runtime configuration.
//!
//! All types are serializable/deserializable via serde + serde_yaml. Secret
//! material that lives in the config file (gateway token/password) is redacted
//! from `Debug` output; credential material that belongs in the secret store
//! is held as [`SecretString`] and never serialized.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Default gateway port when the config does not name one.
pub const DEFAULT_GATEWAY_PORT: u16 = 18789;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of an auth profile: `"<provider>:<identity-or-default>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileId(pub String);

impl ProfileId {
    /// Derive the profile id for a provider and optional identity hint.
    ///
    /// Re-authenticating the same identity yields the same id, so the profile
    /// entry is overwritten rather than duplicated.
    pub fn derive(provider: &str, identity_hint: Option<&str>) -> Self {
        let identity = identity_hint
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("default");
        Self(format!("{provider}:{identity}"))
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Network interface scope the gateway binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Loopback,
    Lan,
    Tailnet,
    Auto,
}

impl BindMode {
    pub const ALL: [BindMode; 4] = [
        BindMode::Loopback,
        BindMode::Lan,
        BindMode::Tailnet,
        BindMode::Auto,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BindMode::Loopback => "loopback",
            BindMode::Lan => "lan",
            BindMode::Tailnet => "tailnet",
            BindMode::Auto => "auto",
        }
    }
}

/// Gateway authentication mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Off,
    Token,
    Password,
}

impl AuthMode {
    pub const ALL: [AuthMode; 3] = [AuthMode::Off, AuthMode::Token, AuthMode::Password];

    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::Off => "off",
            AuthMode::Token => "token",
            AuthMode::Password => "password",
        }
    }
}

/// Whether and how the gateway is tunneled to a wider network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    #[default]
    Off,
    Serve,
    Funnel,
}

impl ExposureMode {
    pub const ALL: [ExposureMode; 3] = [ExposureMode::Off, ExposureMode::Serve, ExposureMode::Funnel];

    pub fn as_str(self) -> &'static str {
        match self {
            ExposureMode::Off => "off",
            ExposureMode::Serve => "serve",
            ExposureMode::Funnel => "funnel",
        }
    }
}

/// Where the gateway runs relative to this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Local,
    Remote,
}

impl GatewayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayMode::Local => "local",
            GatewayMode::Remote => "remote",
        }
    }
}

/// How a credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialMode {
    #[serde(rename = "oauth")]
    OAuth,
    #[serde(rename = "api_key")]
    ApiKey,
}

impl CredentialMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialMode::OAuth => "oauth",
            CredentialMode::ApiKey => "api_key",
        }
    }
}

macro_rules! display_and_parse {
    ($ty:ident, $what:literal, [$($variant:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lower = s.trim().to_ascii_lowercase();
                $(
                    if lower == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(format!("unknown {} '{}'", $what, s))
            }
        }
    };
}

display_and_parse!(BindMode, "bind mode", [Loopback, Lan, Tailnet, Auto]);
display_and_parse!(AuthMode, "auth mode", [Off, Token, Password]);
display_and_parse!(ExposureMode, "exposure mode", [Off, Serve, Funnel]);
display_and_parse!(GatewayMode, "gateway mode", [Local, Remote]);
display_and_parse!(CredentialMode, "credential mode", [OAuth, ApiKey]);

// ---------------------------------------------------------------------------
// Gateway config
// ---------------------------------------------------------------------------

/// Gateway authentication settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GatewayAuth {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for GatewayAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayAuth")
            .field("mode", &self.mode)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Tunnel exposure settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExposureConfig {
    #[serde(default)]
    pub mode: ExposureMode,
    /// Tear the tunnel down when the gateway exits.
    #[serde(default)]
    pub reset_on_exit: bool,
}

/// Connection details for a gateway hosted elsewhere.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemoteGateway {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl fmt::Debug for RemoteGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteGateway")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bind: BindMode,
    #[serde(default)]
    pub auth: GatewayAuth,
    #[serde(default)]
    pub exposure: ExposureConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteGateway>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Local,
            port: DEFAULT_GATEWAY_PORT,
            bind: BindMode::Loopback,
            auth: GatewayAuth::default(),
            exposure: ExposureConfig::default(),
            remote: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth profiles, model, providers
// ---------------------------------------------------------------------------

/// Descriptor of a stored credential. The secret itself lives in the secret store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProfile {
    pub profile_id: ProfileId,
    pub provider: String,
    pub mode: CredentialMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<String>,
}

/// Endpoint for a provider that needs no handshake (e.g. a local LM server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

/// Stamp left by the wizard on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardMetadata {
    pub last_run_at: DateTime<Utc>,
    pub last_run_command: String,
    pub last_run_mode: GatewayMode,
}

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

/// Root of the gatehouse YAML config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Ordered set keyed by `profile_id`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth_profiles: Vec<AuthProfile>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub providers: std::collections::BTreeMap<String, ProviderEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wizard: Option<WizardMetadata>,
}

impl RuntimeConfig {
    /// Insert `profile`, replacing an existing entry with the same id in place.
    pub fn upsert_auth_profile(&mut self, profile: AuthProfile) {
        match self
            .auth_profiles
            .iter_mut()
            .find(|p| p.profile_id == profile.profile_id)
        {
            Some(existing) => *existing = profile,
            None => self.auth_profiles.push(profile),
        }
    }

    /// Set the primary model, keeping any configured fallbacks.
    pub fn set_primary_model(&mut self, model: impl Into<String>) {
        self.model.primary = Some(model.into());
    }

    pub fn stamp_wizard(&mut self, command: &str, mode: GatewayMode, now: DateTime<Utc>) {
        self.wizard = Some(WizardMetadata {
            last_run_at: now,
            last_run_command: command.to_string(),
            last_run_mode: mode,
        });
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Result of one successful authorization flow. Never logged or serialized.
#[derive(Debug, Clone)]
pub struct Credential {
    pub provider: String,
    pub mode: CredentialMode,
    pub secret: SecretString,
    /// Account identity, e.g. an email address.
    pub identity_hint: Option<String>,
}

impl Credential {
    pub fn profile_id(&self) -> ProfileId {
        ProfileId::derive(&self.provider, self.identity_hint.as_deref())
    }

    pub fn profile(&self) -> AuthProfile {
        AuthProfile {
            profile_id: self.profile_id(),
            provider: self.provider.clone(),
            mode: self.mode,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
