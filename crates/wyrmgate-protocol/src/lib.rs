//! Wire protocol for Wyrmgate.
//!
//! This crate knows how bytes are laid out on the wire, and nothing about
//! who is connected or what a packet means:
//!
//! - **Framing** ([`FrameCodec`], [`FrameConfig`]): length-prefixed frames
//!   over a raw stream, with a hard size limit.
//! - **Packets** ([`SendablePacket`], [`PacketWriter`], [`PacketReader`]):
//!   the outbound capability the session layer consumes, plus builders.
//! - **Identity** ([`SessionId`], [`ActorId`]): newtypes used by the
//!   session layer and by dispatchers.
//! - **Errors** ([`FramingError`], [`ProtocolError`]).
//!
//! ```text
//! Transport (raw bytes) → Protocol (frames) → Crypto (plaintext) → Session
//! ```

mod error;
mod frame;
#[cfg(feature = "json")]
mod json;
mod packet;
mod types;

pub use error::{FramingError, ProtocolError};
pub use frame::{DEFAULT_MAX_FRAME_LEN, FrameCodec, FrameConfig, Frames, HEADER_LEN};
#[cfg(feature = "json")]
pub use json::JsonPacket;
pub use packet::{PacketReader, PacketWriter, SendablePacket};
pub use types::{ActorId, SessionId};
