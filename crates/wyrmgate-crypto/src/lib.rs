//! Per-session frame encryption for Wyrmgate.
//!
//! - [`Cipher`] is the algorithm seam. [`KeystreamCipher`] is the default.
//! - [`SessionKeys`] is the seed material a key exchange hands over.
//! - [`SessionCrypto`] is what a session owns: one encrypt state and one
//!   decrypt state, each behind its own lock.
//!
//! ```rust
//! use wyrmgate_crypto::{KeystreamCipher, SessionCrypto, SessionKeys};
//!
//! let keys = SessionKeys::generate();
//! let server = SessionCrypto::new();
//! let client = SessionCrypto::new();
//! server.seed(&KeystreamCipher, &keys).unwrap();
//! client.seed(&KeystreamCipher, &keys.mirrored()).unwrap();
//!
//! let frame = client.encrypt(b"hello").unwrap();
//! assert_eq!(server.decrypt(&frame).unwrap(), b"hello");
//! ```

mod cipher;
mod error;
mod keys;
mod session_crypto;

pub use cipher::{Cipher, Decryptor, Encryptor, KeystreamCipher, TAG_LEN};
pub use error::CryptoError;
pub use keys::{KEY_LEN, SessionKeys};
pub use session_crypto::SessionCrypto;
