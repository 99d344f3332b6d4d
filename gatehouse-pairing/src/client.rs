//! Pairing client: discovery bookkeeping, the one-shot auto-connect, and
//! explicit pairing with token caching.
//!
//! The client is shared between the discovery loop and whoever drives manual
//! pairing, so all mutable state sits behind one lock. The lock is never held
//! across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use gatehouse_core::secrets::BRIDGE_NAMESPACE;
use gatehouse_core::SecretStore;
use secrecy::{ExposeSecret, SecretString};

use crate::error::PairingError;
use crate::identity::NodeIdentity;
use crate::peer::{DiscoveredPeer, PeerEvent, PeerSet};
use crate::transport::{BridgeConnector, BridgeSession, DiscoveryTransport, PairingTransport};

/// Secret-store account holding the bridge token for `node_id`.
pub fn bridge_token_account(node_id: &str) -> String {
    format!("bridge-token.{node_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoConnect {
    Skipped(SkipReason),
    Connected(BridgeSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyAttempted,
    AlreadyConnected,
    PairingInProgress,
    NoCachedToken,
    NoPeers,
}

#[derive(Debug, Default)]
struct ClientState {
    discovering: bool,
    peers: PeerSet,
    auto_connect_attempted: bool,
    pairing_in_progress: bool,
    connected: Option<BridgeSession>,
}

impl ClientState {
    fn skip_reason(&self) -> Option<SkipReason> {
        if self.auto_connect_attempted {
            Some(SkipReason::AlreadyAttempted)
        } else if self.connected.is_some() {
            Some(SkipReason::AlreadyConnected)
        } else if self.pairing_in_progress {
            Some(SkipReason::PairingInProgress)
        } else {
            None
        }
    }
}

pub struct PairingClient {
    identity: NodeIdentity,
    secrets: Arc<dyn SecretStore>,
    pairing: Arc<dyn PairingTransport>,
    connector: Arc<dyn BridgeConnector>,
    state: Mutex<ClientState>,
}

impl PairingClient {
    pub fn new(
        identity: NodeIdentity,
        secrets: Arc<dyn SecretStore>,
        pairing: Arc<dyn PairingTransport>,
        connector: Arc<dyn BridgeConnector>,
    ) -> Self {
        Self {
            identity,
            secrets,
            pairing,
            connector,
            state: Mutex::default(),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Peers seen during the current discovery session.
    pub fn peers(&self) -> Vec<DiscoveredPeer> {
        self.lock().peers.as_slice().to_vec()
    }

    pub fn is_discovering(&self) -> bool {
        self.lock().discovering
    }

    pub fn connected(&self) -> Option<BridgeSession> {
        self.lock().connected.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected.is_some()
    }

    /// Record a discovery event. Returns `true` when the peer list changed.
    pub fn on_peer_event(&self, event: PeerEvent) -> bool {
        match event {
            PeerEvent::Found(peer) => {
                tracing::debug!(peer = %peer.id, endpoint = %peer.endpoint, "peer discovered");
                self.lock().peers.upsert(peer)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Auto-connect
    // -----------------------------------------------------------------------

    /// Connect to the first discovered peer with the cached token.
    ///
    /// Fires at most once per client; never performs a pairing handshake.
    pub async fn maybe_auto_connect(&self) -> Result<AutoConnect, PairingError> {
        if let Some(reason) = self.lock().skip_reason() {
            return Ok(AutoConnect::Skipped(reason));
        }

        let Some(token) = self.cached_token() else {
            return Ok(AutoConnect::Skipped(SkipReason::NoCachedToken));
        };

        let peer = {
            let mut state = self.lock();
            if let Some(reason) = state.skip_reason() {
                return Ok(AutoConnect::Skipped(reason));
            }
            let Some(peer) = state.peers.first().cloned() else {
                return Ok(AutoConnect::Skipped(SkipReason::NoPeers));
            };
            state.auto_connect_attempted = true;
            peer
        };

        tracing::info!(peer = %peer.id, "auto-connecting with cached token");
        let session = self.connect_with(&peer, &token).await?;
        Ok(AutoConnect::Connected(session))
    }

    // -----------------------------------------------------------------------
    // Explicit pairing
    // -----------------------------------------------------------------------

    /// Pair with `peer_id` and connect.
    ///
    /// A cached token is reused without a handshake. Otherwise the gateway
    /// issues one, which is persisted before the connection is attempted.
    pub async fn pair(&self, peer_id: &str) -> Result<BridgeSession, PairingError> {
        let (peer, _guard) = {
            let mut state = self.lock();
            if state.pairing_in_progress {
                return Err(PairingError::PairingInProgress);
            }
            let peer = state
                .peers
                .get(peer_id)
                .cloned()
                .ok_or_else(|| PairingError::UnknownPeer(peer_id.to_string()))?;
            state.pairing_in_progress = true;
            (peer, PairingGuard { state: &self.state })
        };

        let token = match self.cached_token() {
            Some(token) => token,
            None => {
                let token = self.pairing.pair(&peer, &self.identity, None).await?;
                if token.expose_secret().trim().is_empty() {
                    return Err(PairingError::EmptyToken);
                }
                let account = bridge_token_account(&self.identity.node_id);
                if !self.secrets.save(BRIDGE_NAMESPACE, &account, &token) {
                    tracing::warn!(
                        namespace = BRIDGE_NAMESPACE,
                        account = %account,
                        "could not cache pairing token; continuing without it"
                    );
                }
                token
            }
        };

        self.connect_with(&peer, &token).await
    }

    // -----------------------------------------------------------------------
    // Discovery loop
    // -----------------------------------------------------------------------

    /// Drive one discovery session until the transport's stream ends.
    ///
    /// Each new peer gives auto-connect a chance to fire. The transport is
    /// stopped and peers are cleared when the session ends, including when
    /// this future is dropped.
    pub async fn run_discovery(&self, transport: &dyn DiscoveryTransport) -> Result<(), PairingError> {
        let mut events = transport.start()?;
        self.lock().discovering = true;
        let _session = DiscoveryGuard {
            state: &self.state,
            transport,
        };

        while let Some(event) = events.recv().await {
            if !self.on_peer_event(event) {
                continue;
            }
            match self.maybe_auto_connect().await {
                Ok(AutoConnect::Connected(session)) => {
                    tracing::info!(peer = %session.peer_id, "bridge connected");
                }
                Ok(AutoConnect::Skipped(reason)) => {
                    tracing::debug!(?reason, "auto-connect skipped");
                }
                Err(err) => tracing::warn!(error = %err, "auto-connect failed"),
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn cached_token(&self) -> Option<SecretString> {
        let account = bridge_token_account(&self.identity.node_id);
        self.secrets
            .load(BRIDGE_NAMESPACE, &account)
            .filter(|t| !t.expose_secret().trim().is_empty())
    }

    async fn connect_with(
        &self,
        peer: &DiscoveredPeer,
        token: &SecretString,
    ) -> Result<BridgeSession, PairingError> {
        match self.connector.connect(peer, &self.identity, token).await {
            Ok(session) => {
                self.lock().connected = Some(session.clone());
                Ok(session)
            }
            Err(PairingError::Unauthorized) => {
                let account = bridge_token_account(&self.identity.node_id);
                self.secrets.delete(BRIDGE_NAMESPACE, &account);
                tracing::warn!(peer = %peer.id, "gateway rejected cached token; cleared");
                Err(PairingError::TokenRejected)
            }
            Err(err) => Err(err),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears `pairing_in_progress` however `pair` exits.
struct PairingGuard<'a> {
    state: &'a Mutex<ClientState>,
}

impl Drop for PairingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.pairing_in_progress = false;
    }
}

/// Stops the transport and forgets peers however `run_discovery` exits.
struct DiscoveryGuard<'a> {
    state: &'a Mutex<ClientState>,
    transport: &'a dyn DiscoveryTransport,
}

impl Drop for DiscoveryGuard<'_> {
    fn drop(&mut self) {
        self.transport.stop();
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.discovering = false;
        state.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_is_scoped_to_node() {
        assert_eq!(bridge_token_account("node-abc"), "bridge-token.node-abc");
    }

    #[test]
    fn skip_reasons_in_priority_order() {
        let mut state = ClientState::default();
        assert_eq!(state.skip_reason(), None);
        state.pairing_in_progress = true;
        assert_eq!(state.skip_reason(), Some(SkipReason::PairingInProgress));
        state.auto_connect_attempted = true;
        assert_eq!(state.skip_reason(), Some(SkipReason::AlreadyAttempted));
    }
}
