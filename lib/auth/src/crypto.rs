//! Authenticated encryption of session credentials.
//!
//! Cookie values are `base64url(nonce || ciphertext || tag)` under
//! AES-256-GCM with a fresh 96-bit random nonce per value. The key is
//! loaded once at startup; rotating it invalidates every outstanding
//! session.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use rootcause::Report;
use std::fmt;

use crate::error::AuthError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Symmetric cipher for session cookie values.
#[derive(Clone)]
pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl SessionCipher {
    /// Creates a cipher from raw key bytes.
    #[must_use]
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new((&key).into()),
        }
    }

    /// Creates a cipher from a base64 or base64url encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the value does not decode to
    /// exactly 32 bytes.
    pub fn from_encoded_key(encoded: &str) -> Result<Self, Report<AuthError>> {
        let value = encoded.trim();

        let candidates = [
            STANDARD.decode(value).ok(),
            URL_SAFE.decode(value).ok(),
            STANDARD_NO_PAD.decode(value).ok(),
            URL_SAFE_NO_PAD.decode(value).ok(),
        ];

        for candidate in candidates.into_iter().flatten() {
            if let Ok(key) = <[u8; KEY_LEN]>::try_from(candidate.as_slice()) {
                return Ok(Self::new(key));
            }
        }

        Err(AuthError::configuration(
            "session encryption key must decode to exactly 32 bytes (base64 or base64url)",
        )
        .into())
    }

    /// Encrypts a plaintext into a cookie-safe string.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cipher rejects the payload size.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, Report<AuthError>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| AuthError::configuration("session payload could not be encrypted"))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Decrypts a value produced by [`SessionCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Decryption` for malformed encoding, truncated
    /// input, a failed integrity check, or non-UTF-8 plaintext.
    pub fn decrypt(&self, encoded: &str) -> Result<String, Report<AuthError>> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| AuthError::Decryption)?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(AuthError::Decryption.into());
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AuthError::Decryption)?;

        Ok(String::from_utf8(plaintext).map_err(|_| AuthError::Decryption)?)
    }
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCipher")
            .field("key", &"<redacted>")
            .finish()
    }
}
