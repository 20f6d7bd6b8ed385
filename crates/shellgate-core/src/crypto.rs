//! Cryptographic primitives for credential secrets at rest.
//!
//! Provides AES-256-GCM authenticated encryption and a zeroize-on-drop key
//! newtype. Credential passwords and private keys are stored sealed and only
//! opened when a transport session is being established.
//!
//! # Security model
//!
//! - Every seal generates a fresh 96-bit nonce via `OsRng`.
//! - Ciphertext format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! - The master key never appears in `Debug` output and is cleared from
//!   memory on drop.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Minimum ciphertext length: 12-byte nonce + 16-byte AES-GCM tag.
const MIN_CIPHERTEXT_LEN: usize = 12 + 16;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// A 256-bit master key that is zeroized on drop.
///
/// The inner bytes are never exposed in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    ///
    /// Use with care: the caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Seal a secret using AES-256-GCM with a fresh random nonce.
///
/// Returns `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn seal(key: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    // nonce || ciphertext (includes tag appended by aes-gcm)
    let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Open a sealed secret produced by [`seal`].
///
/// Expects the format `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Errors
///
/// Returns [`CryptoError::CiphertextTooShort`] if the input is shorter than
/// 28 bytes (nonce + tag minimum).
///
/// Returns [`CryptoError::Decryption`] if authentication fails (wrong key,
/// corrupted data, or tampered tag).
pub fn open(key: &MasterKey, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if combined.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::CiphertextTooShort {
            expected: MIN_CIPHERTEXT_LEN,
            actual: combined.len(),
        });
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })
}
