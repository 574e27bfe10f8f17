//! Per-connection handler: key setup, activation, and the receive loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Ask the key provider for session keys and seed the session cipher
//!   2. Attach the connection and register the session
//!   3. Loop: read bytes → split frames → decrypt + dispatch, one at a time,
//!      until the peer leaves, the server shuts down, or the session is
//!      closed from any task
//!   4. Tear the session down, whatever ended the loop

use std::sync::Arc;

use bytes::BytesMut;
use tokio::sync::broadcast;
use wyrmgate_protocol::FrameCodec;
use wyrmgate_session::{ClientSession, Dispatcher, SessionRegistry};
use wyrmgate_transport::{Connection, TransportError};

use crate::server::ServerState;
use crate::{KeyProvider, WyrmgateError};

/// Drop guard that tears a session down if the handler never reaches its
/// own teardown (panic or task cancellation).
///
/// Since `Drop` is synchronous, we spawn a fire-and-forget task for the
/// async teardown.
struct TeardownGuard<C: Connection> {
    session: Option<Arc<ClientSession<C>>>,
}

impl<C: Connection> TeardownGuard<C> {
    fn new(session: Arc<ClientSession<C>>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn disarm(&mut self) {
        self.session = None;
    }
}

impl<C: Connection> Drop for TeardownGuard<C> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    session.on_disconnected().await;
                });
            }
        }
    }
}

/// Handles a single connection from accept to teardown.
pub(crate) async fn handle_connection<C, D, K>(
    conn: C,
    state: Arc<ServerState<C, D, K>>,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), WyrmgateError>
where
    C: Connection<Error = TransportError>,
    D: Dispatcher<C>,
    K: KeyProvider,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let registry: Arc<dyn SessionRegistry<C>> = state.registry.clone();
    let session = ClientSession::new(
        registry,
        Arc::clone(&state.cipher),
        state.config.session.clone(),
        state.config.frame,
    );
    let mut guard = TeardownGuard::new(Arc::clone(&session));

    let result = run_session(&session, &conn, &state, shutdown).await;

    session.on_disconnected().await;
    guard.disarm();

    if let Err(e) = &result {
        tracing::warn!(%conn_id, session = %session, error = %e, "connection closed on error");
    }
    result
}

async fn run_session<C, D, K>(
    session: &Arc<ClientSession<C>>,
    conn: &Arc<C>,
    state: &ServerState<C, D, K>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), WyrmgateError>
where
    C: Connection<Error = TransportError>,
    D: Dispatcher<C>,
    K: KeyProvider,
{
    // --- Step 1: Keys ---
    let peer_addr = conn.peer_addr();
    let keys = state.keys.session_keys(&peer_addr).await?;
    session.seed_crypto(&keys)?;

    // --- Step 2: Activate ---
    session.on_connected(&peer_addr, Arc::clone(conn)).await?;

    // --- Step 3: Receive loop ---
    let idle_timeout = state.config.session.idle_timeout();
    let mut codec = FrameCodec::new(state.config.frame);
    let mut buf = BytesMut::with_capacity(state.config.session.read_buffer_size);

    loop {
        let chunk = tokio::select! {
            received = recv_with_idle(conn.as_ref(), idle_timeout) => received,
            _ = shutdown.recv() => {
                tracing::debug!(session = %session, "server shutting down");
                return Ok(());
            }
            _ = session.closed() => {
                tracing::debug!(session = %session, "session closed elsewhere");
                return Ok(());
            }
        };

        let chunk = match chunk {
            Some(Ok(Some(chunk))) => chunk,
            Some(Ok(None)) => {
                tracing::info!(session = %session, "connection closed by peer");
                return Ok(());
            }
            Some(Err(e)) => {
                tracing::debug!(session = %session, error = %e, "recv error");
                return Err(e.into());
            }
            None => {
                tracing::info!(session = %session, "connection idle, closing");
                session.close().await;
                return Ok(());
            }
        };
        buf.extend_from_slice(&chunk);

        for frame in codec.frames(&mut buf) {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(session = %session, error = %e, "framing error");
                    session.close().await;
                    return Err(e.into());
                }
            };

            if let Err(e) = session.on_frame_received(&frame, &state.dispatcher).await {
                if e.is_fatal() {
                    return Err(e.into());
                }
                tracing::warn!(session = %session, error = %e, "dispatch error");
            }

            if !session.is_active() {
                // Closed from inside the dispatcher or by another task.
                return Ok(());
            }
        }
    }
}

/// `None` when the idle timeout elapsed before any bytes arrived.
async fn recv_with_idle<C>(
    conn: &C,
    idle_timeout: Option<std::time::Duration>,
) -> Option<Result<Option<Vec<u8>>, TransportError>>
where
    C: Connection<Error = TransportError>,
{
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, conn.recv()).await.ok(),
        None => Some(conn.recv().await),
    }
}
