use serde::{Deserialize, Serialize};

/// A gateway found on the local network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeer {
    pub id: String,
    pub display_name: String,
    /// `host:port` of the bridge listener.
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_id: Option<String>,
}

impl DiscoveredPeer {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            endpoint: endpoint.into(),
            debug_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Found(DiscoveredPeer),
}

/// Peers keyed by id, kept in first-discovered order. A repeat sighting
/// replaces the entry in place (last seen wins).
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    peers: Vec<DiscoveredPeer>,
}

impl PeerSet {
    /// Returns `true` when the visible set changed.
    pub fn upsert(&mut self, peer: DiscoveredPeer) -> bool {
        match self.peers.iter_mut().find(|p| p.id == peer.id) {
            Some(existing) if *existing == peer => false,
            Some(existing) => {
                *existing = peer;
                true
            }
            None => {
                self.peers.push(peer);
                true
            }
        }
    }

    pub fn first(&self) -> Option<&DiscoveredPeer> {
        self.peers.first()
    }

    pub fn get(&self, id: &str) -> Option<&DiscoveredPeer> {
        self.peers.iter().find(|p| p.id == id)
    }

    pub fn as_slice(&self) -> &[DiscoveredPeer] {
        &self.peers
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
