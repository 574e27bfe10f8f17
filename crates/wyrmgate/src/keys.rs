//! Hook for seeding each session's cipher.

use std::future::Future;

use wyrmgate_crypto::{CryptoError, SessionKeys};

/// Supplies the keys for a newly accepted connection.
///
/// This is where a key exchange plugs in. It runs before the session is
/// activated; an error rejects the connection.
pub trait KeyProvider: Send + Sync + 'static {
    fn session_keys(
        &self,
        peer_addr: &str,
    ) -> impl Future<Output = Result<SessionKeys, CryptoError>> + Send;
}

/// Hands every connection the same preconfigured keys.
#[derive(Debug, Clone)]
pub struct StaticKeys {
    keys: SessionKeys,
}

impl StaticKeys {
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }

    /// Derives both directional keys from a shared secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::new(SessionKeys::derive(secret)?))
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }
}

impl KeyProvider for StaticKeys {
    async fn session_keys(&self, _peer_addr: &str) -> Result<SessionKeys, CryptoError> {
        Ok(self.keys.clone())
    }
}
