//! Schema-driven encryption and decryption of whole rows.
//!
//! A [`RowTransform`] pairs the immutable [`FieldRegistry`] with a
//! [`FieldCipher`] and rewrites exactly the registry-listed fields of a row.
//! Every other field is moved through untouched, so non-sensitive columns stay
//! queryable at the store.
//!
//! # Failure policy
//!
//! - Encryption errors propagate; a row is never returned half-encrypted.
//! - Decryption never fails a row. Numeric fields that cannot be decrypted fall
//!   back to their parsed value or `0`; string fields are left as read and a
//!   warning is logged.

pub mod legacy;

use std::{num::NonZeroUsize, sync::Arc};

use futures::future::try_join_all;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::{CipherError, FieldCipher, FieldKey};
use crate::schema::{FieldKind, FieldRegistry};

/// A record as exchanged with the store: a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Errors produced by the row transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A sensitive field could not be encrypted.
    #[error("failed to encrypt {table}.{field}")]
    Encryption {
        table: String,
        field: String,
        #[source]
        source: CipherError,
    },

    /// A sensitive field holds an array or object, which has no scalar form.
    #[error("{table}.{field} holds a non-scalar value and cannot be encrypted")]
    UnsupportedValue { table: String, field: String },

    /// A background decryption worker did not complete.
    #[error("decryption worker failed: {0}")]
    Worker(String),
}

/// Encrypts and decrypts the sensitive fields of rows.
///
/// Holds the registry and the key for one deployment; clone freely, both are
/// shared behind `Arc`s.
pub struct RowTransform<C = FieldKey> {
    registry: Arc<FieldRegistry>,
    cipher: Arc<C>,
}

impl<C> Clone for RowTransform<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            cipher: Arc::clone(&self.cipher),
        }
    }
}

impl<C> std::fmt::Debug for RowTransform<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowTransform")
            .field("tables", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl<C: FieldCipher> RowTransform<C> {
    /// Create a transform over `registry` using `cipher` for every field.
    pub fn new(registry: Arc<FieldRegistry>, cipher: Arc<C>) -> Self {
        Self { registry, cipher }
    }

    /// The registry this transform consults.
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Encrypt the sensitive fields of `row` for storage in `table`.
    ///
    /// `null` and absent fields are left alone. Numbers and booleans are
    /// encrypted as their string form. Tables without a schema pass through.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnsupportedValue`] for array or object values
    /// and [`TransformError::Encryption`] if the cipher fails.
    pub fn encrypt_row(&self, table: &str, mut row: Row) -> Result<Row, TransformError> {
        let Some(schema) = self.registry.schema_for(table) else {
            return Ok(row);
        };

        for field in schema.keys() {
            let Some(value) = row.get_mut(field) else {
                continue;
            };
            let plaintext = match value {
                Value::Null => continue,
                Value::String(s) => std::mem::take(s),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(TransformError::UnsupportedValue {
                        table: table.to_owned(),
                        field: field.clone(),
                    });
                }
            };
            let ciphertext =
                self.cipher
                    .encrypt_field(&plaintext)
                    .map_err(|source| TransformError::Encryption {
                        table: table.to_owned(),
                        field: field.clone(),
                        source,
                    })?;
            *value = Value::String(ciphertext);
        }
        Ok(row)
    }

    /// Restore the sensitive fields of a `row` read from `table`.
    ///
    /// Fields that are `null`, absent, or not strings are left alone. Values
    /// written before encryption was enabled are recognised and passed
    /// through (see [`legacy`]). Never fails; see the module failure policy.
    pub fn decrypt_row(&self, table: &str, mut row: Row) -> Row {
        let Some(schema) = self.registry.schema_for(table) else {
            return row;
        };

        for (field, kind) in schema {
            let restored = match row.get(field) {
                Some(Value::String(stored)) => self.restore(table, field, *kind, stored),
                _ => continue,
            };
            row.insert(field.clone(), restored);
        }
        row
    }

    fn restore(&self, table: &str, field: &str, kind: FieldKind, stored: &str) -> Value {
        match kind {
            FieldKind::Number if legacy::is_plain_number(stored) => {
                debug!(table, field, "plaintext numeric value passed through");
                number_or_zero(legacy::parse_number(stored))
            }
            FieldKind::String if !legacy::looks_encrypted(stored) => {
                Value::String(stored.to_owned())
            }
            FieldKind::Number => match self.cipher.decrypt_field(stored) {
                Ok(plaintext) => {
                    let parsed = legacy::parse_number(&plaintext);
                    if parsed.is_none() {
                        warn!(table, field, "decrypted value is not numeric; defaulting to 0");
                    }
                    number_or_zero(parsed)
                }
                Err(e) => {
                    warn!(table, field, error = %e, "numeric field failed to decrypt; defaulting");
                    number_or_zero(legacy::parse_number(stored))
                }
            },
            FieldKind::String => match self.cipher.decrypt_field(stored) {
                Ok(plaintext) => Value::String(plaintext),
                Err(e) => {
                    warn!(table, field, error = %e, "string field failed to decrypt; keeping stored value");
                    Value::String(stored.to_owned())
                }
            },
        }
    }
}

impl<C: FieldCipher + 'static> RowTransform<C> {
    /// Decrypt a batch of rows read from `table`, preserving order.
    ///
    /// Rows are split into contiguous chunks that are decrypted concurrently on
    /// the blocking pool. Each row is restored independently, so a bad field
    /// only affects that field.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Worker`] only if a worker task panics or is
    /// cancelled by runtime shutdown.
    pub async fn decrypt_rows(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, TransformError> {
        if rows.is_empty() || self.registry.schema_for(table).is_none() {
            return Ok(rows);
        }

        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        let chunk_len = rows.len().div_ceil(workers);
        debug!(table, rows = rows.len(), chunk_len, "decrypting batch");

        let mut rows = rows.into_iter();
        let mut tasks = Vec::new();
        loop {
            let chunk: Vec<Row> = rows.by_ref().take(chunk_len).collect();
            if chunk.is_empty() {
                break;
            }
            let this = self.clone();
            let table = table.to_owned();
            tasks.push(tokio::task::spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|row| this.decrypt_row(&table, row))
                    .collect::<Vec<_>>()
            }));
        }

        let chunks = try_join_all(tasks)
            .await
            .map_err(|e| TransformError::Worker(e.to_string()))?;
        Ok(chunks.into_iter().flatten().collect())
    }
}

fn number_or_zero(n: Option<Number>) -> Value {
    Value::Number(n.unwrap_or_else(|| Number::from(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MockFieldCipher;
    use serde_json::json;

    fn key() -> Arc<FieldKey> {
        Arc::new(FieldKey::from_bytes(&[0x42u8; 32]).unwrap())
    }

    fn transform() -> RowTransform {
        RowTransform::new(Arc::new(FieldRegistry::builtin()), key())
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn is_base64_blob(value: &Value) -> bool {
        value.as_str().is_some_and(legacy::looks_encrypted)
    }

    #[test]
    fn transaction_scenario() {
        let t = transform();
        let original = row(json!({"amount": 150.5, "description": "Lunch", "category": "food"}));

        let encrypted = t.encrypt_row("transactions", original.clone()).unwrap();
        assert!(is_base64_blob(&encrypted["amount"]));
        assert!(is_base64_blob(&encrypted["description"]));
        assert_ne!(encrypted["description"], json!("Lunch"));
        assert_eq!(encrypted["category"], json!("food"));
        assert_eq!(encrypted.len(), original.len());

        let decrypted = t.decrypt_row("transactions", encrypted);
        assert_eq!(decrypted, original);
    }

    #[test]
    fn row_round_trip_for_every_builtin_table() {
        let t = transform();
        let registry = FieldRegistry::builtin();
        for table in registry.tables() {
            let mut original = Row::new();
            original.insert("id".into(), json!("a1b2"));
            for (i, (field, kind)) in registry.schema_for(table).unwrap().iter().enumerate() {
                let value = match kind {
                    FieldKind::Number if i % 2 == 0 => json!(1200),
                    FieldKind::Number => json!(-87.25),
                    FieldKind::String => json!("Quarterly rebalance"),
                };
                original.insert(field.clone(), value);
            }
            let encrypted = t.encrypt_row(table, original.clone()).unwrap();
            assert_eq!(encrypted["id"], json!("a1b2"));
            assert_eq!(t.decrypt_row(table, encrypted), original, "table {table}");
        }
    }

    #[test]
    fn unknown_table_passes_through() {
        let t = transform();
        let original = row(json!({"name": "Groceries", "color": "#00ff00"}));
        assert_eq!(t.encrypt_row("categories", original.clone()).unwrap(), original);
        assert_eq!(t.decrypt_row("categories", original.clone()), original);
    }

    #[test]
    fn null_and_absent_fields_are_untouched() {
        let t = transform();
        let original = row(json!({"amount": null, "description": "Bus"}));
        let encrypted = t.encrypt_row("transactions", original.clone()).unwrap();
        assert_eq!(encrypted["amount"], Value::Null);
        assert!(!encrypted.contains_key("notes"));

        let decrypted = t.decrypt_row("transactions", encrypted);
        assert_eq!(decrypted, original);
    }

    #[test]
    fn non_scalar_value_is_rejected() {
        let t = transform();
        let err = t
            .encrypt_row("transactions", row(json!({"notes": ["a", "b"]})))
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedValue { ref field, .. } if field == "notes"));
    }

    #[test]
    fn encryption_failure_propagates() {
        let mut cipher = MockFieldCipher::new();
        cipher
            .expect_encrypt_field()
            .returning(|_| Err(CipherError::EncryptionFailed));
        let t = RowTransform::new(Arc::new(FieldRegistry::builtin()), Arc::new(cipher));

        let err = t
            .encrypt_row("accounts", row(json!({"balance": 10})))
            .unwrap_err();
        assert!(matches!(err, TransformError::Encryption { ref table, .. } if table == "accounts"));
    }

    #[test]
    fn legacy_numeric_string_skips_cipher() {
        let mut cipher = MockFieldCipher::new();
        cipher.expect_decrypt_field().never();
        let t = RowTransform::new(Arc::new(FieldRegistry::builtin()), Arc::new(cipher));

        let decrypted = t.decrypt_row("accounts", row(json!({"balance": "150"})));
        assert_eq!(decrypted["balance"], json!(150));
    }

    #[test]
    fn legacy_short_text_skips_cipher() {
        let mut cipher = MockFieldCipher::new();
        cipher.expect_decrypt_field().never();
        let t = RowTransform::new(Arc::new(FieldRegistry::builtin()), Arc::new(cipher));

        let decrypted = t.decrypt_row("transactions", row(json!({"description": "Coffee beans"})));
        assert_eq!(decrypted["description"], json!("Coffee beans"));
    }

    #[test]
    fn non_string_stored_values_are_left_alone() {
        let mut cipher = MockFieldCipher::new();
        cipher.expect_decrypt_field().never();
        let t = RowTransform::new(Arc::new(FieldRegistry::builtin()), Arc::new(cipher));

        let original = row(json!({"amount": 99.9, "description": null}));
        assert_eq!(t.decrypt_row("transactions", original.clone()), original);
    }

    #[test]
    fn corrupt_numeric_ciphertext_defaults_to_zero() {
        let t = transform();
        let decrypted = t.decrypt_row(
            "accounts",
            row(json!({"balance": "q83vASNFZ4mrze8BI0VniavN7wEjRWc="})),
        );
        assert_eq!(decrypted["balance"], json!(0));
    }

    #[test]
    fn non_numeric_plaintext_in_numeric_field_defaults_to_zero() {
        let mut cipher = MockFieldCipher::new();
        cipher
            .expect_decrypt_field()
            .times(1)
            .returning(|_| Ok("abc".to_owned()));
        let t = RowTransform::new(Arc::new(FieldRegistry::builtin()), Arc::new(cipher));

        let decrypted = t.decrypt_row(
            "accounts",
            row(json!({"id": 4, "balance": "q83vASNFZ4mrze8BI0VniavN7wEjRWc="})),
        );
        assert_eq!(decrypted, row(json!({"id": 4, "balance": 0})));
    }

    #[test]
    fn undecryptable_text_is_kept_as_read() {
        let t = transform();
        let stored = "SupermarketGroceriesWeekly";
        let decrypted = t.decrypt_row("transactions", row(json!({"notes": stored})));
        assert_eq!(decrypted["notes"], json!(stored));
    }

    #[test]
    fn foreign_key_ciphertext_defaults_numeric_field() {
        let other = RowTransform::new(
            Arc::new(FieldRegistry::builtin()),
            Arc::new(FieldKey::from_bytes(&[0x07u8; 32]).unwrap()),
        );
        let encrypted = other
            .encrypt_row("budgets", row(json!({"monthly_limit": 800})))
            .unwrap();
        let decrypted = transform().decrypt_row("budgets", encrypted);
        assert_eq!(decrypted["monthly_limit"], json!(0));
    }

    #[test]
    fn numbers_and_strings_in_swapped_slots() {
        let t = transform();
        let encrypted = t
            .encrypt_row("transactions", row(json!({"amount": "42", "description": 7})))
            .unwrap();
        let decrypted = t.decrypt_row("transactions", encrypted);
        assert_eq!(decrypted["amount"], json!(42));
        assert_eq!(decrypted["description"], json!("7"));
    }

    #[tokio::test]
    async fn batch_preserves_order_and_isolates_corruption() {
        let t = transform();
        let first = row(json!({"id": 1, "amount": 12.5, "description": "Taxi"}));
        let second = row(json!({"id": 2, "amount": 300, "description": "Rent share"}));

        let enc_first = t.encrypt_row("transactions", first.clone()).unwrap();
        let mut enc_second = t.encrypt_row("transactions", second.clone()).unwrap();
        enc_second.insert("amount".into(), json!("q83vASNFZ4mrze8BI0VniavN7wEjRWc="));

        let out = t
            .decrypt_rows("transactions", vec![enc_first, enc_second])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], first);
        assert_eq!(out[1]["id"], json!(2));
        assert_eq!(out[1]["amount"], json!(0));
        assert_eq!(out[1]["description"], json!("Rent share"));
    }

    #[tokio::test]
    async fn large_batch_keeps_order() {
        let t = transform();
        let rows: Vec<Row> = (0..257)
            .map(|i| {
                t.encrypt_row("accounts", row(json!({"id": i, "balance": i * 10})))
                    .unwrap()
            })
            .collect();
        let out = t.decrypt_rows("accounts", rows).await.unwrap();
        assert_eq!(out.len(), 257);
        for (i, r) in out.iter().enumerate() {
            assert_eq!(r["id"], json!(i));
            assert_eq!(r["balance"], json!(i * 10));
        }
    }

    #[tokio::test]
    async fn empty_batch_and_unknown_table() {
        let t = transform();
        assert!(t.decrypt_rows("transactions", Vec::new()).await.unwrap().is_empty());
        let rows = vec![row(json!({"name": "x"}))];
        assert_eq!(t.decrypt_rows("tags", rows.clone()).await.unwrap(), rows);
    }
}
