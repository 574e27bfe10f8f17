//! Process-wide table of live sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures_util::future::join_all;
use wyrmgate_protocol::{SendablePacket, SessionId};
use wyrmgate_transport::Connection;

use crate::{ClientSession, Delivery};

/// Lookup, registration, and removal of live sessions.
///
/// Implementations synchronize internally. Registering or removing one
/// session must never wait on another session's registry operation for
/// longer than a map-shard lock.
pub trait SessionRegistry<C: Connection>: Send + Sync + 'static {
    /// Stores the session and returns its newly allocated, unique id.
    fn register(&self, session: Arc<ClientSession<C>>) -> SessionId;

    /// Removes the session. Returns `false` if it was not registered.
    fn remove(&self, session: &ClientSession<C>) -> bool;

    fn lookup(&self, id: SessionId) -> Option<Arc<ClientSession<C>>>;

    /// Snapshot of every registered session.
    fn sessions(&self) -> Vec<Arc<ClientSession<C>>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sharded in-memory registry backed by `DashMap`.
///
/// Ids start at 1, increase monotonically, and are never reused.
pub struct InMemoryRegistry<C: Connection> {
    sessions: DashMap<SessionId, Arc<ClientSession<C>>>,
    next_id: AtomicU64,
}

impl<C: Connection> InMemoryRegistry<C> {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Sends `packet` to every registered session concurrently.
    ///
    /// Sessions that are closing drop it silently; a failing session is
    /// closed on its own and does not affect the others. Returns how many
    /// sessions the packet was written to.
    pub async fn broadcast<P: SendablePacket + ?Sized>(&self, packet: &P) -> usize {
        let sessions = self.sessions();
        let results = join_all(sessions.iter().map(|s| s.send(packet))).await;
        results
            .into_iter()
            .filter(|r| matches!(r, Ok(Delivery::Sent)))
            .count()
    }

    /// Tears down every registered session. Returns how many there were.
    pub async fn shutdown(&self) -> usize {
        let sessions = self.sessions();
        let count = sessions.len();
        join_all(sessions.iter().map(|s| s.on_disconnected())).await;
        tracing::info!(count, "all sessions torn down");
        count
    }
}

impl<C: Connection> Default for InMemoryRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection> SessionRegistry<C> for InMemoryRegistry<C> {
    fn register(&self, session: Arc<ClientSession<C>>) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions.insert(id, session);
        tracing::debug!(session_id = %id, "session registered");
        id
    }

    fn remove(&self, session: &ClientSession<C>) -> bool {
        let Some(id) = session.id() else {
            return false;
        };
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "session removed");
        }
        removed
    }

    fn lookup(&self, id: SessionId) -> Option<Arc<ClientSession<C>>> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn sessions(&self) -> Vec<Arc<ClientSession<C>>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
