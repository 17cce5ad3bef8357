//! Generic CRUD seam and the encrypting wrapper around it.
//!
//! [`RowStore`] is the minimal surface of a remote row store. [`EncryptedStore`]
//! wraps any implementation so that callers only ever see plaintext rows while
//! the store only ever sees ciphertext in sensitive fields.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::crypto::{FieldCipher, FieldKey};
use crate::transform::{Row, RowTransform, TransformError};

/// Errors reported by a [`RowStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("no row {id} in {table}")]
    NotFound { table: String, id: String },

    /// Any other backend failure (network, permission, constraint).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from [`EncryptedStore`] operations.
#[derive(Debug, Error)]
pub enum CrudError {
    /// Rows could not be transformed; nothing was written.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The backend rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A filter referenced an encrypted field, which cannot match at the store.
    #[error("cannot filter {table} on encrypted field {field}")]
    SensitiveFilter { table: String, field: String },
}

/// Minimal CRUD interface of the remote row store.
///
/// Filters are equality matches on the given columns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert `row` into `table`, returning the row as stored.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Apply `patch` to the row `id` of `table`, returning the updated row.
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError>;

    /// Return every row of `table` matching `filter`.
    async fn select(&self, table: &str, filter: Row) -> Result<Vec<Row>, StoreError>;
}

/// A [`RowStore`] wrapper that encrypts on write and decrypts on read.
pub struct EncryptedStore<S, C = FieldKey> {
    store: S,
    transform: RowTransform<C>,
}

impl<S, C> EncryptedStore<S, C>
where
    S: RowStore,
    C: FieldCipher + 'static,
{
    /// Wrap `store`, transforming rows with `transform`.
    pub fn new(store: S, transform: RowTransform<C>) -> Self {
        Self { store, transform }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Encrypt and insert `row`, returning the stored row decrypted.
    ///
    /// # Errors
    ///
    /// Fails without writing if encryption fails; otherwise propagates backend errors.
    pub async fn insert(&self, table: &str, row: Row) -> Result<Row, CrudError> {
        let encrypted = self.transform.encrypt_row(table, row)?;
        let stored = self.store.insert(table, encrypted).await?;
        Ok(self.transform.decrypt_row(table, stored))
    }

    /// Encrypt and apply `patch` to row `id`, returning the updated row decrypted.
    ///
    /// # Errors
    ///
    /// Fails without writing if encryption fails; otherwise propagates backend errors.
    pub async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, CrudError> {
        let encrypted = self.transform.encrypt_row(table, patch)?;
        let stored = self.store.update(table, id, encrypted).await?;
        Ok(self.transform.decrypt_row(table, stored))
    }

    /// Select rows of `table` matching `filter` and decrypt them.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SensitiveFilter`] if `filter` matches an encrypted
    /// field against a non-null value, since randomised ciphertext can never
    /// match at the store. Null is stored as-is and may be filtered on.
    pub async fn select(&self, table: &str, filter: Row) -> Result<Vec<Row>, CrudError> {
        if let Some(schema) = self.transform.registry().schema_for(table) {
            let sensitive = filter
                .iter()
                .find(|(f, v)| !v.is_null() && schema.contains_key(*f))
                .map(|(f, _)| f);
            if let Some(field) = sensitive {
                return Err(CrudError::SensitiveFilter {
                    table: table.to_owned(),
                    field: field.clone(),
                });
            }
        }
        let rows = self.store.select(table, filter).await?;
        debug!(table, rows = rows.len(), "selected rows");
        Ok(self.transform.decrypt_rows(table, rows).await?)
    }
}
