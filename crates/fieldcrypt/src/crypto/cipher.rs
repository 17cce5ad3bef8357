//! AES-GCM encryption and decryption of individual string fields.
//!
//! Every call to [`encrypt_field`] draws a fresh 96-bit nonce from the OS CSPRNG,
//! so equal plaintexts never produce equal ciphertexts under the same key.

use aes_gcm::{
    aead::{consts::U12, rand_core::RngCore, OsRng},
    Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use super::key::FieldKey;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key secret is undecodable or decodes to an unsupported length.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The AEAD refused to encrypt.
    #[error("field encryption failed")]
    EncryptionFailed,

    /// The blob is malformed, the tag did not verify, or the plaintext is not UTF-8.
    #[error("field decryption failed: {0}")]
    DecryptionFailed(&'static str),
}

/// A parsed, encrypted field value.
///
/// The string representation is `base64(nonce || ciphertext+tag)` using the
/// standard padded alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl EncryptedField {
    /// Encode this value to its canonical base64 representation.
    pub fn to_base64(&self) -> String {
        let mut blob = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        blob.extend_from_slice(&self.nonce);
        blob.extend_from_slice(&self.ciphertext);
        STANDARD.encode(blob)
    }

    /// Parse a base64 blob back into an [`EncryptedField`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::DecryptionFailed`] if the string is not base64 or
    /// is too short to hold a nonce and a tag.
    pub fn from_base64(s: &str) -> Result<Self, CipherError> {
        let blob = STANDARD
            .decode(s)
            .map_err(|_| CipherError::DecryptionFailed("not valid base64"))?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::DecryptionFailed("blob too short"));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Single-string encryption primitive used by the row transform.
///
/// [`FieldKey`] is the production implementation; tests substitute a mock to
/// observe which fields actually reach the cipher.
#[cfg_attr(test, mockall::automock)]
pub trait FieldCipher: Send + Sync {
    /// Encrypt `plaintext` into a base64 blob.
    fn encrypt_field(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decrypt a base64 blob produced by [`FieldCipher::encrypt_field`].
    fn decrypt_field(&self, ciphertext: &str) -> Result<String, CipherError>;
}

impl FieldCipher for FieldKey {
    fn encrypt_field(&self, plaintext: &str) -> Result<String, CipherError> {
        encrypt_field(plaintext, self)
    }

    fn decrypt_field(&self, ciphertext: &str) -> Result<String, CipherError> {
        decrypt_field(ciphertext, self)
    }
}

/// Encrypt a plaintext string under `key`, returning `base64(nonce || ciphertext+tag)`.
///
/// No associated data is bound.
///
/// # Errors
///
/// Returns [`CipherError::EncryptionFailed`] on an internal AEAD error (only
/// reachable for plaintexts beyond the GCM length limit).
pub fn encrypt_field(plaintext: &str, key: &FieldKey) -> Result<String, CipherError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = key
        .seal(Nonce::<U12>::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|_| CipherError::EncryptionFailed)?;

    Ok(EncryptedField {
        nonce: nonce_bytes,
        ciphertext,
    }
    .to_base64())
}

/// Decrypt a base64 blob produced by [`encrypt_field`].
///
/// # Errors
///
/// Returns [`CipherError::DecryptionFailed`] if the blob is malformed, the
/// authentication tag does not verify (wrong key or tampered data), or the
/// recovered bytes are not UTF-8.
pub fn decrypt_field(ciphertext: &str, key: &FieldKey) -> Result<String, CipherError> {
    let field = EncryptedField::from_base64(ciphertext)?;
    let plaintext = key
        .open(Nonce::<U12>::from_slice(&field.nonce), &field.ciphertext)
        .map_err(|_| CipherError::DecryptionFailed("authentication failed"))?;
    String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed("plaintext is not UTF-8"))
}
