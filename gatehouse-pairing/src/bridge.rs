//! Newline-delimited JSON client for the gateway's bridge listener.
//!
//! One request object per line, one response object per line:
//!
//! ```text
//! → {"cmd":"pair","node_id":"node-1","display_name":"Desk","platform":"linux x86_64","version":"0.1.11"}
//! ← {"ok":true,"data":{"token":"…"}}
//! → {"cmd":"hello","node_id":"node-1",…,"token":"…"}
//! ← {"ok":true,"data":{"server_name":"studio"}}
//! ← {"ok":false,"error":"unauthorized"}
//! ```
//!
//! The protocol is plain TCP, so only loopback endpoints are dialed. A remote
//! gateway is reached through a tunnel that terminates on 127.0.0.1.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::PairingError;
use crate::identity::NodeIdentity;
use crate::peer::DiscoveredPeer;
use crate::transport::{BridgeConnector, BridgeSession, PairingTransport};

const UNAUTHORIZED: &str = "unauthorized";

#[derive(Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub cmd: String,
    pub node_id: String,
    pub display_name: String,
    pub platform: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl std::fmt::Debug for BridgeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRequest")
            .field("cmd", &self.cmd)
            .field("node_id", &self.node_id)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl BridgeRequest {
    fn new(cmd: &str, identity: &NodeIdentity, token: Option<&SecretString>) -> Self {
        Self {
            cmd: cmd.to_string(),
            node_id: identity.node_id.clone(),
            display_name: identity.display_name.clone(),
            platform: identity.platform.clone(),
            version: identity.version.clone(),
            token: token.map(|t| t.expose_secret().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }
}

/// TCP client speaking the line protocol above.
#[derive(Debug, Clone)]
pub struct LineBridgeClient {
    timeout: Duration,
}

impl Default for LineBridgeClient {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl LineBridgeClient {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn open(&self, endpoint: &str) -> Result<Connection, PairingError> {
        let connect_err = |message: String| PairingError::Connect {
            endpoint: endpoint.to_string(),
            message,
        };
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(endpoint)
            .await
            .map_err(|e| connect_err(e.to_string()))?
            .collect();
        if addrs.is_empty() {
            return Err(connect_err("no address".to_string()));
        }
        if !addrs.iter().all(is_loopback) {
            tracing::warn!(endpoint, "refusing plaintext bridge connection to non-loopback endpoint");
            return Err(PairingError::InsecureTransport {
                endpoint: endpoint.to_string(),
            });
        }

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(addrs.as_slice()))
            .await
            .map_err(|_| connect_err("timed out".to_string()))?
            .map_err(|e| connect_err(e.to_string()))?;
        Ok(Connection {
            reader: BufReader::new(stream),
            endpoint: endpoint.to_string(),
            timeout: self.timeout,
        })
    }
}

struct Connection {
    reader: BufReader<TcpStream>,
    endpoint: String,
    timeout: Duration,
}

impl Connection {
    async fn call(&mut self, request: &BridgeRequest) -> Result<BridgeResponse, PairingError> {
        let mut payload = serde_json::to_vec(request)?;
        payload.push(b'\n');
        let endpoint = self.endpoint.clone();
        let io = |err: std::io::Error| PairingError::Connect {
            endpoint: endpoint.clone(),
            message: err.to_string(),
        };

        let stream = self.reader.get_mut();
        stream.write_all(&payload).await.map_err(io)?;
        stream.flush().await.map_err(io)?;

        let mut line = String::new();
        let read = tokio::time::timeout(self.timeout, self.reader.read_line(&mut line))
            .await
            .map_err(|_| PairingError::Protocol(format!("no reply to '{}'", request.cmd)))?
            .map_err(io)?;
        if read == 0 {
            return Err(PairingError::Protocol(format!(
                "connection closed before reply to '{}'",
                request.cmd
            )));
        }
        Ok(serde_json::from_str(line.trim())?)
    }
}

fn is_loopback(addr: &SocketAddr) -> bool {
    addr.ip().to_canonical().is_loopback()
}

fn rejected(response: &BridgeResponse) -> bool {
    !response.ok && response.error.as_deref() == Some(UNAUTHORIZED)
}

#[async_trait]
impl PairingTransport for LineBridgeClient {
    async fn pair(
        &self,
        peer: &DiscoveredPeer,
        identity: &NodeIdentity,
        existing: Option<&SecretString>,
    ) -> Result<SecretString, PairingError> {
        let mut conn = self.open(&peer.endpoint).await?;

        let paired = conn.call(&BridgeRequest::new("pair", identity, existing)).await?;
        if !paired.ok {
            return Err(PairingError::Handshake(
                paired.error.unwrap_or_else(|| "pairing refused".to_string()),
            ));
        }
        let token = paired.data_str("token").unwrap_or_default().to_string();
        if token.is_empty() {
            return Err(PairingError::EmptyToken);
        }
        tracing::info!(peer = %peer.id, "paired with gateway");
        Ok(SecretString::new(token.into()))
    }
}

#[async_trait]
impl BridgeConnector for LineBridgeClient {
    async fn connect(
        &self,
        peer: &DiscoveredPeer,
        identity: &NodeIdentity,
        token: &SecretString,
    ) -> Result<BridgeSession, PairingError> {
        let mut conn = self.open(&peer.endpoint).await?;
        let hello = conn.call(&BridgeRequest::new("hello", identity, Some(token))).await?;
        if rejected(&hello) {
            return Err(PairingError::Unauthorized);
        }
        if !hello.ok {
            return Err(PairingError::Connect {
                endpoint: peer.endpoint.clone(),
                message: hello.error.unwrap_or_else(|| "hello refused".to_string()),
            });
        }
        Ok(BridgeSession {
            peer_id: peer.id.clone(),
            endpoint: peer.endpoint.clone(),
            server_name: hello.data_str("server_name").map(str::to_string),
        })
    }
}
