//! ChaCha20-Poly1305 implementation of the `PiiCipher` port.
//!
//! Each encryption draws a fresh 96-bit nonce from the OS RNG. The output is
//! `base64(nonce || ciphertext || tag)`, which keeps ciphertext text-safe for
//! the store, the cache, and logs.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::domain::ports::{CipherError, PiiCipher};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// AEAD cipher for the email field, keyed explicitly at construction.
pub struct ChaChaPiiCipher {
    cipher: ChaCha20Poly1305,
}

impl ChaChaPiiCipher {
    /// Build a cipher from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Key`] unless `key` is exactly 32 bytes.
    pub fn from_key_bytes(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_LEN {
            return Err(CipherError::key(format!(
                "expected {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }

    /// Build a cipher from a standard base64 encoding of a 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Key`] for invalid base64 or a wrong length.
    pub fn from_base64_key(encoded: &str) -> Result<Self, CipherError> {
        let key = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|err| CipherError::key(format!("key is not valid base64: {err}")))?,
        );
        Self::from_key_bytes(&key)
    }
}

impl std::fmt::Debug for ChaChaPiiCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaChaPiiCipher").finish_non_exhaustive()
    }
}

impl PiiCipher for ChaChaPiiCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0_u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|err| CipherError::encrypt(err.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let sealed = STANDARD
            .decode(ciphertext)
            .map_err(|err| CipherError::decrypt(format!("ciphertext is not valid base64: {err}")))?;
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::decrypt("ciphertext is truncated"));
        }
        let (nonce, body) = sealed.split_at(NONCE_LEN);

        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(Nonce::from_slice(nonce), body)
                .map_err(|_| CipherError::decrypt("authentication failed"))?,
        );
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| CipherError::decrypt("plaintext is not valid UTF-8"))
    }
}
