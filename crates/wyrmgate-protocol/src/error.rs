//! Error types for the protocol layer.
//!
//! Framing problems and packet-building problems are kept apart: a
//! [`FramingError`] means the byte stream itself can no longer be trusted
//! and the connection must go, while a [`ProtocolError`] is about a single
//! packet's contents.

/// Errors produced while splitting a byte stream into frames.
///
/// Every variant is fatal to the connection that produced it.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The length header declared more bytes than the configured maximum.
    ///
    /// Checked before any payload is buffered, so a hostile length field
    /// cannot make us allocate.
    #[error("frame length {declared} exceeds maximum {max}")]
    FrameTooLarge { declared: usize, max: usize },

    /// I/O failure surfaced through the codec plumbing.
    ///
    /// `tokio_util::codec` requires decoder errors to be constructible
    /// from `std::io::Error`.
    #[error("framing I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while building or reading a packet body.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A read ran past the end of the packet.
    #[error("packet truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A string field did not contain valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A string is too long for its 16-bit length prefix.
    #[error("string of {0} bytes does not fit a u16 length prefix")]
    StringTooLong(usize),

    /// Serialization of a packet failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),
}
