//! Discovery, pairing and connection seams.

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::mpsc;

use crate::error::PairingError;
use crate::identity::NodeIdentity;
use crate::peer::{DiscoveredPeer, PeerEvent};

/// Streams peers while a discovery session is open.
pub trait DiscoveryTransport: Send + Sync {
    fn start(&self) -> Result<mpsc::Receiver<PeerEvent>, PairingError>;

    fn stop(&self);
}

#[async_trait]
pub trait PairingTransport: Send + Sync {
    /// Ask `peer` for a token bound to this node. `existing` is presented
    /// when re-pairing; the gateway may return it or issue a new one.
    async fn pair(
        &self,
        peer: &DiscoveredPeer,
        identity: &NodeIdentity,
        existing: Option<&SecretString>,
    ) -> Result<SecretString, PairingError>;
}

/// An established bridge connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSession {
    pub peer_id: String,
    pub endpoint: String,
    pub server_name: Option<String>,
}

#[async_trait]
pub trait BridgeConnector: Send + Sync {
    /// Connect with `token`. A refused token is [`PairingError::Unauthorized`].
    async fn connect(
        &self,
        peer: &DiscoveredPeer,
        identity: &NodeIdentity,
        token: &SecretString,
    ) -> Result<BridgeSession, PairingError>;
}

// ---------------------------------------------------------------------------
// Static discovery
// ---------------------------------------------------------------------------

/// Discovery over a fixed list of endpoints (CLI `--gateway host:port`).
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    peers: Vec<DiscoveredPeer>,
}

impl StaticDiscovery {
    pub fn new(peers: Vec<DiscoveredPeer>) -> Self {
        Self { peers }
    }

    /// One peer per endpoint, id and name derived from the endpoint.
    pub fn from_endpoints<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers = endpoints
            .into_iter()
            .map(|e| {
                let endpoint = e.as_ref().trim().to_string();
                DiscoveredPeer::new(endpoint.clone(), endpoint.clone(), endpoint)
            })
            .collect();
        Self { peers }
    }
}

impl DiscoveryTransport for StaticDiscovery {
    fn start(&self) -> Result<mpsc::Receiver<PeerEvent>, PairingError> {
        let (tx, rx) = mpsc::channel(self.peers.len().max(1));
        for peer in &self.peers {
            tx.try_send(PeerEvent::Found(peer.clone()))
                .map_err(|e| PairingError::Discovery(e.to_string()))?;
        }
        Ok(rx)
    }

    fn stop(&self) {}
}
