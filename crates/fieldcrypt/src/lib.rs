//! Field-level encryption for finance records.
//!
//! Sensitive columns (amounts, balances, limits, free-text notes) are encrypted
//! individually with AES-GCM before rows reach the store and restored after they
//! are read back. Which columns are sensitive is decided per table by a
//! [`FieldRegistry`]; everything else stays plaintext and queryable.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fieldcrypt::{FieldKey, FieldRegistry, RowTransform};
//!
//! let key = FieldKey::import(&std::env::var("FIELD_ENCRYPTION_KEY")?)?;
//! let transform = RowTransform::new(Arc::new(FieldRegistry::builtin()), Arc::new(key));
//!
//! let stored = transform.encrypt_row("transactions", row)?;
//! let restored = transform.decrypt_row("transactions", stored);
//! ```

pub mod crypto;
pub mod schema;
pub mod store;
pub mod transform;

pub use crypto::{CipherError, FieldCipher, FieldKey};
pub use schema::{FieldKind, FieldRegistry, RegistryError};
pub use store::{CrudError, EncryptedStore, RowStore, StoreError};
pub use transform::{Row, RowTransform, TransformError};
