//! Per-session cipher context with independently locked directions.

use parking_lot::Mutex;

use crate::{Cipher, CryptoError, Decryptor, Encryptor, SessionKeys};

enum Slot<T: ?Sized> {
    Unseeded,
    Seeded(Box<T>),
    Released,
}

impl<T: ?Sized> Slot<T> {
    fn get(&mut self) -> Result<&mut T, CryptoError> {
        match self {
            Slot::Seeded(state) => Ok(&mut **state),
            Slot::Unseeded => Err(CryptoError::NotSeeded),
            Slot::Released => Err(CryptoError::Released),
        }
    }
}

/// One session's crypto state.
///
/// Each direction sits behind its own lock: at most one task encrypts at a
/// time and at most one task decrypts at a time, but an encrypt and a
/// decrypt never wait on each other.
///
/// ```text
/// Unseeded ──seed()──→ Seeded ──release()──→ Released
///     └─────────────────release()──────────────┘
/// ```
pub struct SessionCrypto {
    encrypt: Mutex<Slot<dyn Encryptor>>,
    decrypt: Mutex<Slot<dyn Decryptor>>,
}

impl SessionCrypto {
    /// Creates an unseeded context. Every transform fails with
    /// [`CryptoError::NotSeeded`] until [`seed`](Self::seed) is called.
    pub fn new() -> Self {
        Self {
            encrypt: Mutex::new(Slot::Unseeded),
            decrypt: Mutex::new(Slot::Unseeded),
        }
    }

    /// Installs cipher state for both directions.
    ///
    /// # Errors
    /// - [`CryptoError::AlreadySeeded`] if called twice.
    /// - [`CryptoError::Released`] after [`release`](Self::release).
    pub fn seed(&self, cipher: &dyn Cipher, keys: &SessionKeys) -> Result<(), CryptoError> {
        let encryptor = cipher.encryptor(keys.outbound())?;
        let decryptor = cipher.decryptor(keys.inbound())?;

        // Lock order: encrypt, then decrypt. Only seed and release hold both.
        let mut enc = self.encrypt.lock();
        let mut dec = self.decrypt.lock();
        match (&*enc, &*dec) {
            (Slot::Unseeded, Slot::Unseeded) => {}
            (Slot::Released, _) | (_, Slot::Released) => return Err(CryptoError::Released),
            _ => return Err(CryptoError::AlreadySeeded),
        }
        *enc = Slot::Seeded(encryptor);
        *dec = Slot::Seeded(decryptor);
        tracing::debug!("session crypto seeded");
        Ok(())
    }

    pub fn is_seeded(&self) -> bool {
        matches!(*self.encrypt.lock(), Slot::Seeded(_))
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt.lock().get()?.encrypt(plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.decrypt.lock().get()?.decrypt(ciphertext)
    }

    /// Drops the cipher state for both directions. Idempotent.
    pub fn release(&self) {
        let mut enc = self.encrypt.lock();
        let mut dec = self.decrypt.lock();
        *enc = Slot::Released;
        *dec = Slot::Released;
    }
}

impl Default for SessionCrypto {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.encrypt.lock() {
            Slot::Unseeded => "unseeded",
            Slot::Seeded(_) => "seeded",
            Slot::Released => "released",
        };
        f.debug_struct("SessionCrypto").field("state", &state).finish()
    }
}
