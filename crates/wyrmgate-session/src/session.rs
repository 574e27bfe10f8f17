//! The per-connection client session.
//!
//! A [`ClientSession`] is created when a connection is accepted and lives
//! until teardown. It owns the write side of the connection and the
//! session's crypto state, and it carries the identity the rest of the
//! server cares about: remote IP, account name, and bound actor.
//!
//! Inbound flow (one receive task per connection):
//!
//! ```text
//! frame body ──decrypt──→ plaintext ──Dispatcher::handle──→ (replies via send)
//! ```
//!
//! Outbound flow (any task):
//!
//! ```text
//! packet ──serialize──→ plaintext ──encrypt──→ ciphertext ──frame──→ write
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use wyrmgate_crypto::{Cipher, CryptoError, SessionCrypto, SessionKeys};
use wyrmgate_protocol::{ActorId, FrameCodec, FrameConfig, SendablePacket, SessionId};
use wyrmgate_transport::{Connection, TransportError};

use crate::lifecycle::AtomicLifecycle;
use crate::{
    Dispatcher, LifecycleState, ProtocolViolation, SessionConfig, SessionError, SessionRegistry,
};

/// What happened to a packet handed to [`ClientSession::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was written to the connection.
    Sent,
    /// The session was not active, so nothing was written.
    Dropped,
}

/// One client connection's session.
///
/// Always handled through `Arc<ClientSession<C>>`: the registry, the
/// receive task, and any producer that wants to push packets each hold a
/// clone.
pub struct ClientSession<C: Connection> {
    id: OnceLock<SessionId>,
    ip: OnceLock<String>,
    account_name: Mutex<Option<String>>,
    active_char: Mutex<Option<ActorId>>,
    state: AtomicLifecycle,
    torn_down: AtomicBool,
    /// Outbound slot. Held across encrypt and write so frames leave in
    /// cipher-counter order and never interleave.
    connection: tokio::sync::Mutex<Option<Arc<C>>>,
    /// Fired by the first [`close`](ClientSession::close).
    closing: CancellationToken,
    crypto: SessionCrypto,
    cipher: Arc<dyn Cipher>,
    codec: FrameCodec,
    registry: Arc<dyn SessionRegistry<C>>,
    config: SessionConfig,
}

impl<C: Connection> ClientSession<C> {
    /// Creates a session in the `Connecting` state.
    pub fn new(
        registry: Arc<dyn SessionRegistry<C>>,
        cipher: Arc<dyn Cipher>,
        config: SessionConfig,
        frame: FrameConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: OnceLock::new(),
            ip: OnceLock::new(),
            account_name: Mutex::new(None),
            active_char: Mutex::new(None),
            state: AtomicLifecycle::new(),
            torn_down: AtomicBool::new(false),
            connection: tokio::sync::Mutex::new(None),
            closing: CancellationToken::new(),
            crypto: SessionCrypto::new(),
            cipher,
            codec: FrameCodec::new(frame),
            registry,
            config,
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Installs the cipher keys produced by the key exchange.
    ///
    /// Allowed while `Connecting` or `Active`. Decrypting or encrypting
    /// before this fails with [`CryptoError::NotSeeded`].
    pub fn seed_crypto(&self, keys: &SessionKeys) -> Result<(), SessionError> {
        let state = self.state.load();
        if state >= LifecycleState::Closing {
            return Err(ProtocolViolation::InvalidState {
                operation: "seed_crypto",
                state,
            }
            .into());
        }
        self.crypto.seed(self.cipher.as_ref(), keys)?;
        Ok(())
    }

    /// Attaches the connection, captures the remote IP, moves to `Active`,
    /// and registers the session.
    ///
    /// # Errors
    /// [`ProtocolViolation::InvalidState`] unless the session is still
    /// `Connecting`, or if it started closing before registration finished.
    pub async fn on_connected(
        self: &Arc<Self>,
        remote_address: &str,
        connection: Arc<C>,
    ) -> Result<SessionId, SessionError> {
        // Held through registration. Teardown takes the same lock before it
        // looks at the id, so it either sees the registration or prevents it.
        let mut slot = self.connection.lock().await;
        let state = self.state.load();
        if state != LifecycleState::Connecting {
            return Err(ProtocolViolation::InvalidState {
                operation: "on_connected",
                state,
            }
            .into());
        }
        let _ = self.ip.set(normalize_address(remote_address));
        self.state
            .transition(LifecycleState::Connecting, LifecycleState::Active)
            .map_err(|state| ProtocolViolation::InvalidState {
                operation: "on_connected",
                state,
            })?;
        *slot = Some(connection);

        let id = self.registry.register(Arc::clone(self));
        let _ = self.id.set(id);

        let state = self.state.load();
        if state != LifecycleState::Active {
            self.registry.remove(self);
            return Err(ProtocolViolation::InvalidState {
                operation: "on_connected",
                state,
            }
            .into());
        }
        drop(slot);

        tracing::info!(session = %self, "session active");
        Ok(id)
    }

    /// Decrypts one inbound frame body and hands the plaintext to the
    /// dispatcher.
    ///
    /// Frames arriving on a closing session are ignored. A decryption
    /// failure closes the connection. A dispatch error closes it only when
    /// [`DispatchError::closes_connection`](crate::DispatchError::closes_connection)
    /// says so; otherwise the error is returned and the session stays open.
    pub async fn on_frame_received<D: Dispatcher<C>>(
        self: &Arc<Self>,
        raw_frame: &[u8],
        dispatcher: &D,
    ) -> Result<(), SessionError> {
        match self.state.load() {
            LifecycleState::Active => {}
            LifecycleState::Connecting => return Err(CryptoError::NotSeeded.into()),
            state => {
                tracing::debug!(session = %self, %state, "ignoring frame on closing session");
                return Ok(());
            }
        }

        let plaintext = match self.crypto.decrypt(raw_frame) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!(session = %self, error = %e, "decrypt failed");
                self.close().await;
                return Err(e.into());
            }
        };

        if let Err(e) = dispatcher.handle(self, Bytes::from(plaintext)).await {
            if e.closes_connection() {
                tracing::warn!(session = %self, error = %e, "dispatcher closed connection");
                self.close().await;
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Serializes, encrypts, frames, and writes one packet.
    ///
    /// Safe to call from the dispatch callback and from any other task at
    /// the same time; writes are serialized per session. On a session that
    /// is not `Active` nothing is written and [`Delivery::Dropped`] is
    /// returned.
    ///
    /// # Errors
    /// Serialization failures are returned and leave the session open.
    /// Crypto, framing, and transport failures (including a write that
    /// exceeds `write_timeout_ms`) close the connection.
    pub async fn send<P: SendablePacket + ?Sized>(
        &self,
        packet: &P,
    ) -> Result<Delivery, SessionError> {
        if self.state.load() != LifecycleState::Active {
            tracing::debug!(session = %self, "dropping send on inactive session");
            return Ok(Delivery::Dropped);
        }
        let payload = packet.serialize()?;

        let slot = self.connection.lock().await;
        let Some(conn) = slot.as_ref() else {
            return Ok(Delivery::Dropped);
        };
        if self.state.load() != LifecycleState::Active {
            return Ok(Delivery::Dropped);
        }

        let result = match self.seal(&payload) {
            Ok(frame) => {
                let timeout = self.config.write_timeout();
                match tokio::time::timeout(timeout, conn.send(&frame)).await {
                    Ok(Ok(())) => Ok(Delivery::Sent),
                    Ok(Err(e)) => Err(SessionError::transport(e)),
                    Err(_) => Err(SessionError::transport(TransportError::WriteTimeout(
                        self.config.write_timeout_ms,
                    ))),
                }
            }
            Err(e) => Err(e),
        };
        drop(slot);

        if let Err(e) = &result {
            tracing::warn!(session = %self, error = %e, "send failed");
            self.close().await;
        }
        result
    }

    fn seal(&self, payload: &[u8]) -> Result<Bytes, SessionError> {
        let ciphertext = self.crypto.encrypt(payload)?;
        Ok(self.codec.encode_frame(&ciphertext)?)
    }

    /// Moves to `Closing` and shuts the connection down.
    ///
    /// Used on fatal errors and inactivity. The session stays registered
    /// until [`on_disconnected`](Self::on_disconnected) runs; whoever owns
    /// the receive loop learns about the close through
    /// [`closed`](Self::closed).
    pub async fn close(&self) {
        let previous = self.state.advance(LifecycleState::Closing);
        if previous < LifecycleState::Closing {
            tracing::debug!(session = %self, "session closing");
        }
        self.closing.cancel();
        let conn = self.connection.lock().await.take();
        if let Some(conn) = conn {
            if let Err(e) = conn.close().await {
                tracing::debug!(session = %self, error = %e, "connection close failed");
            }
        }
    }

    /// Tears the session down. A second call is a no-op.
    ///
    /// Removes the session from the registry, releases the connection and
    /// crypto state, and unbinds the actor without touching the actor
    /// itself. Ends in `Closed`.
    pub async fn on_disconnected(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.advance(LifecycleState::Closing);

        {
            // Waits out an in-flight on_connected.
            let _slot = self.connection.lock().await;
            if self.id.get().is_some() {
                self.registry.remove(self);
            }
        }
        self.close().await;
        self.crypto.release();
        let actor = self.active_char.lock().take();

        self.state.advance(LifecycleState::Closed);
        tracing::info!(session = %self, actor = ?actor, "session closed");
    }

    /// Resolves once [`close`](Self::close) has been called, from any task.
    /// Resolves immediately if it already was.
    pub async fn closed(&self) {
        self.closing.cancelled().await;
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    /// Registry id, once [`on_connected`](Self::on_connected) has run.
    pub fn id(&self) -> Option<SessionId> {
        self.id.get().copied()
    }

    /// Remote host with the port stripped, once connected.
    pub fn ip(&self) -> Option<&str> {
        self.ip.get().map(String::as_str)
    }

    pub fn state(&self) -> LifecycleState {
        self.state.load()
    }

    pub fn is_active(&self) -> bool {
        self.state.load() == LifecycleState::Active
    }

    pub fn account_name(&self) -> Option<String> {
        self.account_name.lock().clone()
    }

    /// Records the authenticated account.
    ///
    /// # Errors
    /// [`ProtocolViolation::AccountAlreadySet`] if a name is already set;
    /// the existing name is kept. Call
    /// [`clear_account_name`](Self::clear_account_name) first to rebind.
    pub fn set_account_name(&self, name: impl Into<String>) -> Result<(), ProtocolViolation> {
        self.require_active("set_account_name")?;
        let mut slot = self.account_name.lock();
        if slot.is_some() {
            return Err(ProtocolViolation::AccountAlreadySet);
        }
        *slot = Some(name.into());
        Ok(())
    }

    pub fn clear_account_name(&self) -> Option<String> {
        self.account_name.lock().take()
    }

    pub fn active_char(&self) -> Option<ActorId> {
        *self.active_char.lock()
    }

    /// Binds the in-world actor this session controls.
    ///
    /// # Errors
    /// [`ProtocolViolation::CharAlreadyBound`] if an actor is already bound.
    pub fn set_active_char(&self, actor: ActorId) -> Result<(), ProtocolViolation> {
        self.require_active("set_active_char")?;
        let mut slot = self.active_char.lock();
        if slot.is_some() {
            return Err(ProtocolViolation::CharAlreadyBound);
        }
        *slot = Some(actor);
        Ok(())
    }

    pub fn clear_active_char(&self) -> Option<ActorId> {
        self.active_char.lock().take()
    }

    fn require_active(&self, operation: &'static str) -> Result<(), ProtocolViolation> {
        match self.state.load() {
            LifecycleState::Active => Ok(()),
            state => Err(ProtocolViolation::InvalidState { operation, state }),
        }
    }
}

impl<C: Connection> fmt::Display for ClientSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.id.get(), self.ip.get()) {
            (Some(id), Some(ip)) => write!(f, "{id}@{ip}"),
            (None, Some(ip)) => write!(f, "pending@{ip}"),
            _ => f.write_str("pending"),
        }
    }
}

impl<C: Connection> fmt::Debug for ClientSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id.get())
            .field("ip", &self.ip.get())
            .field("state", &self.state.load())
            .field("account_name", &*self.account_name.lock())
            .field("active_char", &*self.active_char.lock())
            .finish_non_exhaustive()
    }
}

/// Reduces a socket address string to its host part.
///
/// Handles `host:port`, a leading `/` (`"/127.0.0.1:12345"`), bracketed
/// IPv6 (`"[::1]:7777"`), and bare hosts with no port.
pub fn normalize_address(remote_address: &str) -> String {
    let addr = remote_address.trim().trim_start_matches('/');

    if let Some(rest) = addr.strip_prefix('[') {
        if let Some((host, _)) = rest.split_once(']') {
            return host.to_string();
        }
    }

    match addr.rsplit_once(':') {
        // More than one colon without brackets is a bare IPv6 address.
        Some((host, _)) if !host.contains(':') => host.to_string(),
        _ => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address_strips_port() {
        assert_eq!(normalize_address("10.0.0.5:5555"), "10.0.0.5");
    }

    #[test]
    fn test_normalize_address_strips_leading_slash() {
        assert_eq!(normalize_address("/127.0.0.1:12345"), "127.0.0.1");
    }

    #[test]
    fn test_normalize_address_bracketed_ipv6() {
        assert_eq!(normalize_address("[::1]:7777"), "::1");
    }

    #[test]
    fn test_normalize_address_bare_ipv6_unchanged() {
        assert_eq!(normalize_address("fe80::1"), "fe80::1");
    }

    #[test]
    fn test_normalize_address_host_without_port_unchanged() {
        assert_eq!(normalize_address("localhost"), "localhost");
    }
}
