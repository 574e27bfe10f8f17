//! Client sessions for Wyrmgate.
//!
//! This crate owns everything about one connected client between the byte
//! stream and the game logic:
//!
//! 1. **Lifecycle**: [`ClientSession`] moves through [`LifecycleState`]
//!    from accept to teardown, and teardown is idempotent.
//! 2. **Crypto**: each session owns its cipher state; inbound frames are
//!    decrypted, outbound packets encrypted and framed.
//! 3. **Identity**: remote IP, account name, and bound actor, each
//!    set at most once until explicitly cleared.
//! 4. **Lookup**: [`SessionRegistry`] / [`InMemoryRegistry`] tracks every
//!    live session by [`SessionId`](wyrmgate_protocol::SessionId).
//! 5. **Dispatch**: decrypted payloads go to a [`Dispatcher`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← interprets packets, replies via ClientSession::send
//!     ↕
//! Session Layer (this crate)  ← lifecycle, crypto, identity, registry
//!     ↕
//! Protocol + Crypto + Transport (below)  ← frames, ciphers, raw bytes
//! ```

mod config;
mod dispatcher;
mod error;
mod lifecycle;
mod registry;
mod session;

pub use config::SessionConfig;
pub use dispatcher::Dispatcher;
pub use error::{BoxedTransportError, DispatchError, ProtocolViolation, SessionError};
pub use lifecycle::LifecycleState;
pub use registry::{InMemoryRegistry, SessionRegistry};
pub use session::{ClientSession, Delivery, normalize_address};
