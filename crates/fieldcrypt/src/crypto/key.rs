//! [`FieldKey`]: the imported symmetric key used for every field operation.

use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose},
    Engine as _,
};
use zeroize::Zeroizing;

use super::cipher::CipherError;

/// AES-192 in GCM mode with the standard 96-bit nonce.
type Aes192Gcm = AesGcm<Aes192, U12>;

/// Standard alphabet; trailing `=` padding is optional on import.
const SECRET_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Key lengths accepted by [`FieldKey::import`] (AES-128, AES-192, AES-256).
pub const ACCEPTED_KEY_LENS: [usize; 3] = [16, 24, 32];

/// The initialised AEAD for one of the accepted key sizes.
enum KeyedAead {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// An imported field-encryption key.
///
/// Only the keyed cipher state is retained; the raw key bytes cannot be read
/// back out through any API. Cheap to share behind an `Arc` and safe to use from
/// many threads at once: encryption and decryption take `&self`.
pub struct FieldKey {
    aead: KeyedAead,
}

impl FieldKey {
    /// Import a key from a standard base64-encoded secret.
    ///
    /// Surrounding whitespace is ignored so that secrets copied into env files
    /// with a trailing newline still import. Padding may be omitted.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyMaterial`] if the secret is not valid
    /// base64 or does not decode to one of [`ACCEPTED_KEY_LENS`] bytes.
    pub fn import(secret: &str) -> Result<Self, CipherError> {
        // Zeroed on drop; the cipher keeps its own expanded key schedule.
        let raw = Zeroizing::new(
            SECRET_ENGINE
                .decode(secret.trim())
                .map_err(|_| CipherError::InvalidKeyMaterial("secret is not valid base64".into()))?,
        );
        Self::from_bytes(&raw)
    }

    /// Build a key directly from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyMaterial`] if `bytes` has an unsupported length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        let invalid = || {
            CipherError::InvalidKeyMaterial(format!(
                "expected 16, 24 or 32 bytes, got {}",
                bytes.len()
            ))
        };
        let aead = match bytes.len() {
            16 => KeyedAead::Aes128(Aes128Gcm::new_from_slice(bytes).map_err(|_| invalid())?),
            24 => KeyedAead::Aes192(Aes192Gcm::new_from_slice(bytes).map_err(|_| invalid())?),
            32 => KeyedAead::Aes256(Aes256Gcm::new_from_slice(bytes).map_err(|_| invalid())?),
            _ => return Err(invalid()),
        };
        Ok(Self { aead })
    }

    /// Key size in bits.
    pub fn bits(&self) -> usize {
        match self.aead {
            KeyedAead::Aes128(_) => 128,
            KeyedAead::Aes192(_) => 192,
            KeyedAead::Aes256(_) => 256,
        }
    }

    pub(crate) fn seal(
        &self,
        nonce: &Nonce<U12>,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, aes_gcm::Error> {
        match &self.aead {
            KeyedAead::Aes128(c) => c.encrypt(nonce, plaintext),
            KeyedAead::Aes192(c) => c.encrypt(nonce, plaintext),
            KeyedAead::Aes256(c) => c.encrypt(nonce, plaintext),
        }
    }

    pub(crate) fn open(
        &self,
        nonce: &Nonce<U12>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, aes_gcm::Error> {
        match &self.aead {
            KeyedAead::Aes128(c) => c.decrypt(nonce, ciphertext),
            KeyedAead::Aes192(c) => c.decrypt(nonce, ciphertext),
            KeyedAead::Aes256(c) => c.decrypt(nonce, ciphertext),
        }
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        write!(f, "FieldKey(AES-{}-GCM, [REDACTED])", self.bits())
    }
}
