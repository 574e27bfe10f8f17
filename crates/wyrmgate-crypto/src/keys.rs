//! Seed material for one session's cipher.

use std::fmt;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::CryptoError;

/// Length in bytes of each directional key.
pub const KEY_LEN: usize = 32;

/// A pair of directional keys, from the server's point of view.
///
/// `inbound` decrypts what the client sends; `outbound` encrypts what the
/// server sends. A client uses [`SessionKeys::mirrored`] to get its own view.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    inbound: [u8; KEY_LEN],
    outbound: [u8; KEY_LEN],
}

impl SessionKeys {
    pub fn new(inbound: [u8; KEY_LEN], outbound: [u8; KEY_LEN]) -> Self {
        Self { inbound, outbound }
    }

    /// Fresh random keys for both directions.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        Self {
            inbound: rng.random(),
            outbound: rng.random(),
        }
    }

    /// Derives both directional keys from one shared secret.
    ///
    /// The directions get distinct keys, so the same secret never produces
    /// the same keystream for client and server.
    pub fn derive(secret: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            inbound: label_key(secret, b"wyrmgate client->server")?,
            outbound: label_key(secret, b"wyrmgate server->client")?,
        })
    }

    /// Swaps the directions, producing the peer's view of the same keys.
    pub fn mirrored(&self) -> Self {
        Self {
            inbound: self.outbound,
            outbound: self.inbound,
        }
    }

    pub fn inbound(&self) -> &[u8; KEY_LEN] {
        &self.inbound
    }

    pub fn outbound(&self) -> &[u8; KEY_LEN] {
        &self.outbound
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

/// HMAC-SHA256(secret, label), used as a simple labelled key derivation.
pub(crate) fn label_key(secret: &[u8], label: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(secret).map_err(|_| CryptoError::InvalidKey)?;
    mac.update(label);
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}
