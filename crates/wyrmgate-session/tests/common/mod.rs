//! Shared fixtures: an in-memory connection and a client-side peer.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use wyrmgate_crypto::{KeystreamCipher, SessionCrypto, SessionKeys};
use wyrmgate_protocol::{FrameCodec, FrameConfig};
use wyrmgate_session::{ClientSession, InMemoryRegistry, SessionConfig, SessionRegistry};
use wyrmgate_transport::{Connection, ConnectionId, TransportError};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Connection that records every write instead of touching a socket.
pub struct MockConnection {
    id: ConnectionId,
    peer: String,
    written: Mutex<Vec<u8>>,
    writes: AtomicUsize,
    closes: AtomicUsize,
    closed: AtomicBool,
    stall_writes: AtomicBool,
}

impl MockConnection {
    pub fn new(peer: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            peer: peer.to_string(),
            written: Mutex::new(Vec::new()),
            writes: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            stall_writes: AtomicBool::new(false),
        })
    }

    /// Makes every later `send` hang forever.
    pub fn stall_writes(&self) {
        self.stall_writes.store(true, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connection for MockConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed("mock closed".into()));
        }
        // Yield mid-write so concurrent senders get a chance to interleave
        // if the session failed to serialize them.
        let (head, tail) = data.split_at(data.len() / 2);
        self.written.lock().extend_from_slice(head);
        tokio::task::yield_now().await;
        self.written.lock().extend_from_slice(tail);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> String {
        self.peer.clone()
    }
}

/// The client's half of a session's crypto, for building inbound frames
/// and reading outbound ones.
pub struct Peer {
    crypto: SessionCrypto,
}

impl Peer {
    pub fn new(server_keys: &SessionKeys) -> Self {
        let crypto = SessionCrypto::new();
        crypto
            .seed(&KeystreamCipher, &server_keys.mirrored())
            .unwrap();
        Self { crypto }
    }

    /// Ciphertext body for one inbound frame.
    pub fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        self.crypto.encrypt(plaintext).unwrap()
    }

    /// Splits everything the server wrote into frames and decrypts each.
    pub fn open_all(&self, wire: &[u8]) -> Vec<Bytes> {
        decode_all(wire)
            .into_iter()
            .map(|body| Bytes::from(self.crypto.decrypt(&body).unwrap()))
            .collect()
    }
}

pub type Registry = InMemoryRegistry<MockConnection>;

pub fn registry() -> Arc<Registry> {
    Arc::new(InMemoryRegistry::new())
}

/// Builds a session seeded with fresh keys and returns it with a peer.
pub fn seeded_session(
    registry: &Arc<Registry>,
    config: SessionConfig,
) -> (Arc<ClientSession<MockConnection>>, Peer) {
    let keys = SessionKeys::generate();
    let dyn_registry: Arc<dyn SessionRegistry<MockConnection>> = registry.clone();
    let session = ClientSession::new(
        dyn_registry,
        Arc::new(KeystreamCipher),
        config,
        FrameConfig::default(),
    );
    session.seed_crypto(&keys).unwrap();
    (session, Peer::new(&keys))
}

/// A seeded session already attached to a fresh mock connection.
pub async fn active_session(
    registry: &Arc<Registry>,
) -> (Arc<ClientSession<MockConnection>>, Arc<MockConnection>, Peer) {
    let (session, peer) = seeded_session(registry, SessionConfig::default());
    let conn = MockConnection::new("10.0.0.5:5555");
    session
        .on_connected(&conn.peer_addr(), Arc::clone(&conn))
        .await
        .unwrap();
    (session, conn, peer)
}

/// Splits raw wire bytes into frame bodies.
pub fn decode_all(wire: &[u8]) -> Vec<Bytes> {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::from(wire);
    let frames: Vec<Bytes> = codec.frames(&mut buf).collect::<Result<_, _>>().unwrap();
    assert!(buf.is_empty(), "trailing partial frame on the wire");
    frames
}
