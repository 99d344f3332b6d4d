//! PairingClient behaviour against in-memory transports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gatehouse_core::secrets::BRIDGE_NAMESPACE;
use gatehouse_core::{MemorySecretStore, SecretStore};
use gatehouse_pairing::{
    bridge_token_account, AutoConnect, BridgeConnector, BridgeSession, DiscoveredPeer,
    DiscoveryTransport, NodeIdentity, PairingClient, PairingError, PairingTransport, PeerEvent,
    SkipReason, StaticDiscovery,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, Notify};

const NODE: &str = "node-test";

fn identity() -> NodeIdentity {
    NodeIdentity {
        node_id: NODE.into(),
        display_name: "Test Node".into(),
        platform: "linux x86_64".into(),
        version: "0.0.0".into(),
    }
}

fn peer(id: &str) -> DiscoveredPeer {
    DiscoveredPeer::new(id, format!("Gateway {id}"), format!("{id}.local:18790"))
}

fn account() -> String {
    bridge_token_account(NODE)
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakePairing {
    issue: String,
    calls: Mutex<Vec<String>>,
}

impl FakePairing {
    fn issuing(token: &str) -> Self {
        Self {
            issue: token.to_string(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PairingTransport for FakePairing {
    async fn pair(
        &self,
        peer: &DiscoveredPeer,
        identity: &NodeIdentity,
        _existing: Option<&SecretString>,
    ) -> Result<SecretString, PairingError> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("{}<-{}", peer.id, identity.node_id));
        Ok(SecretString::new(self.issue.clone().into()))
    }
}

/// Connector that accepts every token except `reject`, recording what it saw
/// and what the secret store held at the moment of the call.
struct FakeConnector {
    reject: Option<String>,
    store: Arc<MemorySecretStore>,
    seen: Mutex<Vec<(String, String, Option<String>)>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeConnector {
    fn new(store: Arc<MemorySecretStore>) -> Self {
        Self {
            reject: None,
            store,
            seen: Mutex::default(),
            gate: None,
        }
    }

    fn rejecting(mut self, token: &str) -> Self {
        self.reject = Some(token.to_string());
        self
    }

    /// Block inside `connect` until released.
    fn gated(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }

    fn seen(&self) -> Vec<(String, String, Option<String>)> {
        self.seen.lock().expect("lock").clone()
    }
}

#[async_trait]
impl BridgeConnector for FakeConnector {
    async fn connect(
        &self,
        peer: &DiscoveredPeer,
        _identity: &NodeIdentity,
        token: &SecretString,
    ) -> Result<BridgeSession, PairingError> {
        let cached = self
            .store
            .load(BRIDGE_NAMESPACE, &account())
            .map(|t| t.expose_secret().to_string());
        self.seen.lock().expect("lock").push((
            peer.id.clone(),
            token.expose_secret().to_string(),
            cached,
        ));
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.reject.as_deref() == Some(token.expose_secret()) {
            return Err(PairingError::Unauthorized);
        }
        Ok(BridgeSession {
            peer_id: peer.id.clone(),
            endpoint: peer.endpoint.clone(),
            server_name: None,
        })
    }
}

/// Discovery whose stream stays open until `stop` is called.
#[derive(Default)]
struct OpenEndedDiscovery {
    peers: Vec<DiscoveredPeer>,
    sender: Mutex<Option<mpsc::Sender<PeerEvent>>>,
    stops: AtomicUsize,
}

impl OpenEndedDiscovery {
    fn new(peers: Vec<DiscoveredPeer>) -> Self {
        Self {
            peers,
            ..Self::default()
        }
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl DiscoveryTransport for OpenEndedDiscovery {
    fn start(&self) -> Result<mpsc::Receiver<PeerEvent>, PairingError> {
        let (tx, rx) = mpsc::channel(self.peers.len().max(1));
        for peer in &self.peers {
            tx.try_send(PeerEvent::Found(peer.clone()))
                .map_err(|e| PairingError::Discovery(e.to_string()))?;
        }
        *self.sender.lock().expect("lock") = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().expect("lock").take();
    }
}

fn client(
    store: &Arc<MemorySecretStore>,
    pairing: &Arc<FakePairing>,
    connector: &Arc<FakeConnector>,
) -> PairingClient {
    PairingClient::new(
        identity(),
        store.clone(),
        pairing.clone(),
        connector.clone(),
    )
}

// ---------------------------------------------------------------------------
// 1. Auto-connect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cached_token_auto_connects_without_handshake() {
    let store = Arc::new(MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, &account(), "T"));
    let pairing = Arc::new(FakePairing::issuing("unused"));
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);

    assert!(client.on_peer_event(PeerEvent::Found(peer("P"))));
    let outcome = client.maybe_auto_connect().await.expect("auto-connect");

    assert!(matches!(outcome, AutoConnect::Connected(ref s) if s.peer_id == "P"));
    assert_eq!(connector.seen()[0].1, "T");
    assert!(pairing.calls().is_empty());
    assert!(client.is_connected());
}

#[tokio::test]
async fn auto_connect_fires_at_most_once() {
    let store = Arc::new(MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, &account(), "T"));
    let pairing = Arc::new(FakePairing::default());
    let connector = Arc::new(FakeConnector::new(store.clone()).rejecting("T"));
    let client = client(&store, &pairing, &connector);

    client.on_peer_event(PeerEvent::Found(peer("P")));
    let first = client.maybe_auto_connect().await;
    assert!(matches!(first, Err(PairingError::TokenRejected)));

    // Token restored and a new peer appears: the latch still holds.
    store.save(BRIDGE_NAMESPACE, &account(), &SecretString::new("T2".into()));
    client.on_peer_event(PeerEvent::Found(peer("Q")));
    let second = client.maybe_auto_connect().await.expect("second");

    assert_eq!(second, AutoConnect::Skipped(SkipReason::AlreadyAttempted));
    assert_eq!(connector.seen().len(), 1);
}

#[tokio::test]
async fn no_cached_token_skips_without_claiming_latch() {
    let store = Arc::new(MemorySecretStore::new());
    let pairing = Arc::new(FakePairing::default());
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);

    client.on_peer_event(PeerEvent::Found(peer("P")));
    assert_eq!(
        client.maybe_auto_connect().await.expect("skip"),
        AutoConnect::Skipped(SkipReason::NoCachedToken)
    );

    store.save(BRIDGE_NAMESPACE, &account(), &SecretString::new("T".into()));
    assert!(matches!(
        client.maybe_auto_connect().await.expect("connect"),
        AutoConnect::Connected(_)
    ));
}

#[tokio::test]
async fn no_peers_skips_without_claiming_latch() {
    let store = Arc::new(MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, &account(), "T"));
    let pairing = Arc::new(FakePairing::default());
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);

    assert_eq!(
        client.maybe_auto_connect().await.expect("skip"),
        AutoConnect::Skipped(SkipReason::NoPeers)
    );
    client.on_peer_event(PeerEvent::Found(peer("P")));
    assert!(matches!(
        client.maybe_auto_connect().await.expect("connect"),
        AutoConnect::Connected(_)
    ));
}

#[tokio::test]
async fn no_auto_connect_while_manual_pairing_in_progress() {
    let store = Arc::new(MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, &account(), "T"));
    let pairing = Arc::new(FakePairing::default());
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let connector = Arc::new(
        FakeConnector::new(store.clone()).gated(entered.clone(), release.clone()),
    );
    let client = client(&store, &pairing, &connector);
    client.on_peer_event(PeerEvent::Found(peer("P")));

    let (paired, auto) = tokio::join!(client.pair("P"), async {
        entered.notified().await;
        let outcome = client.maybe_auto_connect().await;
        release.notify_one();
        outcome
    });

    assert!(paired.is_ok());
    assert_eq!(
        auto.expect("auto"),
        AutoConnect::Skipped(SkipReason::PairingInProgress)
    );
    assert_eq!(connector.seen().len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Manual pairing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cache_miss_handshakes_and_persists_before_connect() {
    let store = Arc::new(MemorySecretStore::new());
    let pairing = Arc::new(FakePairing::issuing("fresh"));
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);
    client.on_peer_event(PeerEvent::Found(peer("P")));

    let session = client.pair("P").await.expect("pair");

    assert_eq!(session.peer_id, "P");
    assert_eq!(pairing.calls(), vec![format!("P<-{NODE}")]);
    assert_eq!(connector.seen().len(), 1, "one hello per pairing");
    let (_, presented, cached_at_connect) = connector.seen()[0].clone();
    assert_eq!(presented, "fresh");
    assert_eq!(cached_at_connect.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn cache_hit_reuses_token_without_handshake() {
    let store = Arc::new(MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, &account(), "T"));
    let pairing = Arc::new(FakePairing::issuing("unused"));
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);
    client.on_peer_event(PeerEvent::Found(peer("P")));

    client.pair("P").await.expect("pair");
    assert!(pairing.calls().is_empty());
    assert_eq!(connector.seen()[0].1, "T");
}

#[tokio::test]
async fn empty_issued_token_is_a_failure() {
    let store = Arc::new(MemorySecretStore::new());
    let pairing = Arc::new(FakePairing::issuing(""));
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);
    client.on_peer_event(PeerEvent::Found(peer("P")));

    let err = client.pair("P").await.unwrap_err();
    assert!(matches!(err, PairingError::EmptyToken));
    assert!(store.snapshot().is_empty());
    assert!(connector.seen().is_empty());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn rejected_cached_token_is_cleared() {
    let store = Arc::new(MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, &account(), "stale"));
    let pairing = Arc::new(FakePairing::default());
    let connector = Arc::new(FakeConnector::new(store.clone()).rejecting("stale"));
    let client = client(&store, &pairing, &connector);
    client.on_peer_event(PeerEvent::Found(peer("P")));

    let err = client.pair("P").await.unwrap_err();
    assert!(matches!(err, PairingError::TokenRejected));
    assert!(store.load(BRIDGE_NAMESPACE, &account()).is_none());
    assert!(pairing.calls().is_empty());
}

#[tokio::test]
async fn unknown_peer_is_reported() {
    let store = Arc::new(MemorySecretStore::new());
    let pairing = Arc::new(FakePairing::issuing("x"));
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);

    let err = client.pair("ghost").await.unwrap_err();
    assert!(matches!(err, PairingError::UnknownPeer(ref id) if id == "ghost"));
}

#[tokio::test]
async fn pairing_flag_is_released_after_failure() {
    let store = Arc::new(MemorySecretStore::new());
    let pairing = Arc::new(FakePairing::issuing(""));
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);
    client.on_peer_event(PeerEvent::Found(peer("P")));

    assert!(client.pair("P").await.is_err());
    // A second attempt is not refused as "in progress".
    assert!(matches!(
        client.pair("P").await.unwrap_err(),
        PairingError::EmptyToken
    ));
}

// ---------------------------------------------------------------------------
// 3. Discovery session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovery_session_auto_connects_then_clears_peers() {
    let store = Arc::new(MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, &account(), "T"));
    let pairing = Arc::new(FakePairing::default());
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);

    let discovery = StaticDiscovery::new(vec![peer("A"), peer("B")]);
    client.run_discovery(&discovery).await.expect("discovery");

    let seen = connector.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "A");
    assert!(client.peers().is_empty());
    assert!(!client.is_discovering());
    assert_eq!(client.connected().map(|s| s.peer_id), Some("A".to_string()));
}

#[tokio::test]
async fn dropped_discovery_session_stops_transport_and_clears_peers() {
    let store = Arc::new(MemorySecretStore::new());
    let pairing = Arc::new(FakePairing::default());
    let connector = Arc::new(FakeConnector::new(store.clone()));
    let client = client(&store, &pairing, &connector);
    let discovery = OpenEndedDiscovery::new(vec![peer("A")]);

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), client.run_discovery(&discovery)).await;
    assert!(outcome.is_err(), "session should still be running when dropped");

    assert_eq!(discovery.stops(), 1);
    assert!(client.peers().is_empty());
    assert!(!client.is_discovering());
}
