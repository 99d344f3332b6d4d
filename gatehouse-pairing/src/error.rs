use gatehouse_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("no discovered gateway with id '{0}'")]
    UnknownPeer(String),

    #[error("a pairing request is already in progress")]
    PairingInProgress,

    #[error("pairing handshake failed: {0}")]
    Handshake(String),

    #[error("pairing failed: gateway returned an empty token")]
    EmptyToken,

    /// The bridge protocol is plaintext; tokens only travel over loopback.
    #[error(
        "refusing plaintext bridge connection to non-loopback {endpoint}; \
         tunnel the gateway to 127.0.0.1 (ssh -N -L <port>:127.0.0.1:<port> <host>)"
    )]
    InsecureTransport { endpoint: String },

    #[error("connection to {endpoint} failed: {message}")]
    Connect { endpoint: String, message: String },

    /// The gateway refused the presented token.
    #[error("gateway rejected the token")]
    Unauthorized,

    /// A cached token was refused; it has been cleared and must be re-paired.
    #[error("cached pairing token was rejected; pair again to continue")]
    TokenRejected,

    #[error("bridge protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
