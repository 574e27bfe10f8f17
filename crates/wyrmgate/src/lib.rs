//! # Wyrmgate
//!
//! Encrypted session gateway for persistent binary game protocols.
//!
//! Wyrmgate owns everything between a raw TCP socket and your packet
//! handlers: length-prefixed framing, per-session encryption, session
//! lifecycle and identity, and a registry of live sessions. You implement
//! a single [`Dispatcher`](wyrmgate_session::Dispatcher) and the gateway
//! does the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wyrmgate::prelude::*;
//!
//! struct Echo;
//!
//! impl Dispatcher<TcpConnection> for Echo {
//!     async fn handle(
//!         &self,
//!         session: &Arc<ClientSession<TcpConnection>>,
//!         payload: Bytes,
//!     ) -> Result<(), DispatchError> {
//!         session.send(&payload).await?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<(), WyrmgateError> {
//! let server = WyrmgateServer::builder()
//!     .bind("0.0.0.0:7777")
//!     .build(Echo, StaticKeys::from_secret(b"realm key")?)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod keys;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::WyrmgateError;
pub use keys::{KeyProvider, StaticKeys};
pub use server::{ShutdownHandle, WyrmgateServer, WyrmgateServerBuilder};

pub use wyrmgate_crypto as crypto;
pub use wyrmgate_protocol as protocol;
pub use wyrmgate_session as session;
pub use wyrmgate_transport as transport;

/// Everything needed to write a dispatcher and start a server.
pub mod prelude {
    pub use std::sync::Arc;

    pub use bytes::Bytes;

    pub use crate::{
        ConfigError, KeyProvider, ServerConfig, ShutdownHandle, StaticKeys, WyrmgateError,
        WyrmgateServer, WyrmgateServerBuilder,
    };
    pub use wyrmgate_crypto::{Cipher, CryptoError, KeystreamCipher, SessionKeys};
    #[cfg(feature = "json")]
    pub use wyrmgate_protocol::JsonPacket;
    pub use wyrmgate_protocol::{
        ActorId, FrameConfig, FramingError, PacketReader, PacketWriter, ProtocolError,
        SendablePacket, SessionId,
    };
    pub use wyrmgate_session::{
        ClientSession, Delivery, DispatchError, Dispatcher, InMemoryRegistry, LifecycleState,
        ProtocolViolation, SessionConfig, SessionError, SessionRegistry,
    };
    pub use wyrmgate_transport::{Connection, TcpConnection, TcpTransport, Transport};
}
