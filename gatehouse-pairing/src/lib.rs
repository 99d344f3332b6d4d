//! Client-side pairing with a gatehouse gateway.
//!
//! A node discovers gateways, pairs with one to obtain a bridge token, caches
//! that token in the secret store, and reconnects with it automatically the
//! next time a gateway shows up.

mod error;

pub mod bridge;
pub mod client;
pub mod identity;
pub mod peer;
pub mod transport;

pub use bridge::LineBridgeClient;
pub use client::{bridge_token_account, AutoConnect, PairingClient, SkipReason};
pub use error::PairingError;
pub use identity::NodeIdentity;
pub use peer::{DiscoveredPeer, PeerEvent, PeerSet};
pub use transport::{
    BridgeConnector, BridgeSession, DiscoveryTransport, PairingTransport, StaticDiscovery,
};
