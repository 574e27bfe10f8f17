//! Error types for the crypto layer.

/// Errors produced while seeding or running a session cipher.
///
/// Every variant is fatal for the connection that produced it. The peer is
/// never told which one occurred.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Encrypt or decrypt was called before the handshake seeded the cipher.
    #[error("cipher not seeded")]
    NotSeeded,

    /// The cipher was seeded a second time.
    #[error("cipher already seeded")]
    AlreadySeeded,

    /// The crypto state was released during teardown.
    #[error("cipher state released")]
    Released,

    /// Key material could not be used to key the cipher.
    #[error("invalid key material")]
    InvalidKey,

    /// The frame is shorter than the authentication tag.
    #[error("ciphertext too short: {len} bytes")]
    Truncated { len: usize },

    /// The authentication tag did not verify. The frame was corrupted,
    /// forged, replayed, or encrypted under a different key.
    #[error("authentication failed on frame {counter}")]
    TagMismatch { counter: u64 },
}
