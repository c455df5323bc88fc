//! Port for the symmetric cipher protecting the email field.
//!
//! The cipher is constructed with an explicit key and injected into every
//! consumer; there is no process-wide key state.

use super::define_port_error;

define_port_error! {
    /// Errors raised by PII cipher adapters.
    pub enum CipherError {
        /// Key material is malformed or has the wrong length.
        Key { message: String } => "cipher key rejected: {message}",
        /// Encryption failed.
        Encrypt { message: String } => "encryption failed: {message}",
        /// Ciphertext is malformed, truncated, or fails authentication.
        Decrypt { message: String } => "decryption failed: {message}",
    }
}

/// Encrypt and decrypt PII as text-safe strings.
#[cfg_attr(test, mockall::automock)]
pub trait PiiCipher: Send + Sync {
    /// Encrypt `plaintext`, returning a text-safe ciphertext.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Reverse [`PiiCipher::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

/// Deterministic stand-in that tags and reverses text.
///
/// Offers no secrecy. Useful where the real cipher's randomness would make
/// assertions awkward.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePiiCipher;

const FIXTURE_PREFIX: &str = "sealed:";

impl PiiCipher for FixturePiiCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(format!("{FIXTURE_PREFIX}{}", plaintext.chars().rev().collect::<String>()))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        ciphertext
            .strip_prefix(FIXTURE_PREFIX)
            .map(|body| body.chars().rev().collect())
            .ok_or_else(|| CipherError::decrypt("missing fixture prefix"))
    }
}
