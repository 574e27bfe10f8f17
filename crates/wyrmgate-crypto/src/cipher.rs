//! The cipher seam and the default keystream cipher.
//!
//! A [`Cipher`] is a stateless factory. Given a directional key it builds an
//! [`Encryptor`] or a [`Decryptor`], each carrying its own mutable state
//! (frame counters, key schedules). One session owns one of each, so no
//! state is ever shared between sessions or between directions.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::keys::{label_key, KEY_LEN};
use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Stateful outbound transform.
pub trait Encryptor: Send {
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Stateful inbound transform.
pub trait Decryptor: Send {
    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Builds per-direction cipher state from key material.
///
/// Implementations are shared by every session (`Arc<dyn Cipher>`), so they
/// must not hold per-session state themselves.
pub trait Cipher: Send + Sync + 'static {
    fn encryptor(&self, key: &[u8; KEY_LEN]) -> Result<Box<dyn Encryptor>, CryptoError>;
    fn decryptor(&self, key: &[u8; KEY_LEN]) -> Result<Box<dyn Decryptor>, CryptoError>;
}

// ---------------------------------------------------------------------------
// KeystreamCipher
// ---------------------------------------------------------------------------

/// SHA-256 counter keystream with a truncated HMAC-SHA256 tag.
///
/// Ciphertext layout for frame `n`:
///
/// ```text
/// ┌───────────────────────────────┬───────────────────────────┐
/// │ plaintext XOR keystream(n)    │ HMAC(mac_key, n ‖ ct)[..16]│
/// └───────────────────────────────┴───────────────────────────┘
/// ```
///
/// `n` is implicit: both ends count frames per direction. A dropped,
/// reordered or replayed frame fails the tag check.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeystreamCipher;

impl Cipher for KeystreamCipher {
    fn encryptor(&self, key: &[u8; KEY_LEN]) -> Result<Box<dyn Encryptor>, CryptoError> {
        Ok(Box::new(KeystreamState::new(key)?))
    }

    fn decryptor(&self, key: &[u8; KEY_LEN]) -> Result<Box<dyn Decryptor>, CryptoError> {
        Ok(Box::new(KeystreamState::new(key)?))
    }
}

struct KeystreamState {
    enc_key: [u8; KEY_LEN],
    mac: HmacSha256,
    counter: u64,
}

impl KeystreamState {
    fn new(key: &[u8; KEY_LEN]) -> Result<Self, CryptoError> {
        let enc_key = label_key(key, b"enc")?;
        let mac_key = label_key(key, b"mac")?;
        let mac = HmacSha256::new_from_slice(&mac_key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self {
            enc_key,
            mac,
            counter: 0,
        })
    }

    fn apply_keystream(&self, data: &mut [u8]) {
        for (block, chunk) in data.chunks_mut(32).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(self.enc_key);
            hasher.update(self.counter.to_le_bytes());
            hasher.update((block as u64).to_le_bytes());
            let pad = hasher.finalize();
            for (byte, k) in chunk.iter_mut().zip(pad.iter()) {
                *byte ^= k;
            }
        }
    }

    fn tag_mac(&self, ciphertext: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(&self.counter.to_le_bytes());
        mac.update(ciphertext);
        mac
    }
}

impl Encryptor for KeystreamState {
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = Vec::with_capacity(plaintext.len() + TAG_LEN);
        out.extend_from_slice(plaintext);
        self.apply_keystream(&mut out);

        let tag = self.tag_mac(&out).finalize().into_bytes();
        out.extend_from_slice(&tag[..TAG_LEN]);

        self.counter = self.counter.wrapping_add(1);
        Ok(out)
    }
}

impl Decryptor for KeystreamState {
    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::Truncated {
                len: ciphertext.len(),
            });
        }
        let (body, tag) = ciphertext.split_at(ciphertext.len() - TAG_LEN);

        self.tag_mac(body)
            .verify_truncated_left(tag)
            .map_err(|_| CryptoError::TagMismatch {
                counter: self.counter,
            })?;

        let mut out = body.to_vec();
        self.apply_keystream(&mut out);
        self.counter = self.counter.wrapping_add(1);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: [u8; KEY_LEN]) -> (Box<dyn Encryptor>, Box<dyn Decryptor>) {
        let cipher = KeystreamCipher;
        (cipher.encryptor(&key).unwrap(), cipher.decryptor(&key).unwrap())
    }

    #[test]
    fn test_encrypt_then_decrypt_across_many_frames() {
        let (mut enc, mut dec) = pair([7; KEY_LEN]);
        for i in 0..50u32 {
            let plaintext = vec![i as u8; (i as usize) * 13];
            let ct = enc.encrypt(&plaintext).unwrap();
            assert_eq!(ct.len(), plaintext.len() + TAG_LEN);
            assert_eq!(dec.decrypt(&ct).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_encrypt_same_plaintext_differs_per_frame() {
        let (mut enc, _) = pair([7; KEY_LEN]);
        let a = enc.encrypt(b"hello").unwrap();
        let b = enc.encrypt(b"hello").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_tampered_frame_returns_tag_mismatch() {
        let (mut enc, mut dec) = pair([7; KEY_LEN]);
        let mut ct = enc.encrypt(b"attack at dawn").unwrap();
        ct[0] ^= 1;
        assert!(matches!(
            dec.decrypt(&ct),
            Err(CryptoError::TagMismatch { counter: 0 })
        ));
    }

    #[test]
    fn test_decrypt_short_frame_returns_truncated() {
        let (_, mut dec) = pair([7; KEY_LEN]);
        assert!(matches!(
            dec.decrypt(&[0; 5]),
            Err(CryptoError::Truncated { len: 5 })
        ));
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let (mut enc, _) = pair([1; KEY_LEN]);
        let (_, mut dec) = pair([2; KEY_LEN]);
        let ct = enc.encrypt(b"secret").unwrap();
        assert!(dec.decrypt(&ct).is_err());
    }

    #[test]
    fn test_decrypt_skipped_frame_fails() {
        let (mut enc, mut dec) = pair([7; KEY_LEN]);
        let _first = enc.encrypt(b"one").unwrap();
        let second = enc.encrypt(b"two").unwrap();
        assert!(matches!(
            dec.decrypt(&second),
            Err(CryptoError::TagMismatch { counter: 0 })
        ));
    }

    #[test]
    fn test_empty_plaintext_round_trips() {
        let (mut enc, mut dec) = pair([3; KEY_LEN]);
        let ct = enc.encrypt(b"").unwrap();
        assert_eq!(ct.len(), TAG_LEN);
        assert!(dec.decrypt(&ct).unwrap().is_empty());
    }
}
