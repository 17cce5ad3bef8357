//! AES-GCM field encryption primitives.
//!
//! This module is intentionally free of schema, row and store dependencies.
//! It provides key import and the low-level encrypt/decrypt operations used by
//! the row transform.
//!
//! # Ciphertext format
//!
//! ```text
//! base64(nonce[12] || ciphertext || tag[16])
//! ```
//!
//! Standard alphabet with `=` padding. The blob carries no version marker, so
//! stored values written before encryption was enabled are distinguished by
//! inspection in [`crate::transform`].

pub mod cipher;
pub mod key;

pub use cipher::{decrypt_field, encrypt_field, CipherError, EncryptedField, FieldCipher};
pub use key::FieldKey;

#[cfg(test)]
pub use cipher::MockFieldCipher;
