//! [`FieldRegistry`]: which fields of which tables are stored encrypted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scalar type a sensitive field has in its plaintext form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Restored to a JSON number after decryption.
    Number,
    /// Restored as-is after decryption.
    String,
}

/// Sensitive fields of one table, keyed by field name.
pub type TableSchema = BTreeMap<String, FieldKind>;

/// Errors from building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The document is neither valid YAML nor valid JSON of the expected shape.
    #[error("registry document is not valid YAML or JSON: {0}")]
    Parse(String),

    /// A table was declared without any sensitive fields.
    #[error("table {0} declares no sensitive fields")]
    EmptyTable(String),
}

/// Immutable map of `table -> { field -> kind }`.
///
/// Built once at startup and shared by reference; a table that is not present
/// has no sensitive fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRegistry {
    tables: BTreeMap<String, TableSchema>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the schema for `table`.
    pub fn with_table<I, F>(mut self, table: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (F, FieldKind)>,
        F: Into<String>,
    {
        let schema = fields.into_iter().map(|(f, k)| (f.into(), k)).collect();
        self.tables.insert(table.into(), schema);
        self
    }

    /// Parse a registry document, trying YAML first and falling back to JSON.
    ///
    /// The expected shape is `{ tables: { <table>: { <field>: number|string } } }`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] if the text matches neither format and
    /// [`RegistryError::EmptyTable`] if a table lists no fields.
    pub fn from_document(text: &str) -> Result<Self, RegistryError> {
        let registry: Self = match serde_yaml::from_str(text) {
            Ok(parsed) => parsed,
            Err(yaml_err) => serde_json::from_str(text)
                .map_err(|_| RegistryError::Parse(yaml_err.to_string()))?,
        };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        match self.tables.iter().find(|(_, fields)| fields.is_empty()) {
            Some((table, _)) => Err(RegistryError::EmptyTable(table.clone())),
            None => Ok(()),
        }
    }

    /// Look up the sensitive fields of `table`.
    ///
    /// `None` means the table has nothing to transform.
    pub fn schema_for(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    /// Return the number of tables with sensitive fields.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Return `true` if no table has sensitive fields.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterate over table names in sorted order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_table_has_no_schema() {
        let registry = FieldRegistry::new().with_table("accounts", [("balance", FieldKind::Number)]);
        assert!(registry.schema_for("categories").is_none());
        assert_eq!(
            registry.schema_for("accounts").unwrap().get("balance"),
            Some(&FieldKind::Number)
        );
    }

    #[test]
    fn with_table_replaces_existing() {
        let registry = FieldRegistry::new()
            .with_table("budgets", [("limit", FieldKind::Number)])
            .with_table("budgets", [("monthly_limit", FieldKind::Number)]);
        let schema = registry.schema_for("budgets").unwrap();
        assert_eq!(schema.len(), 1);
        assert!(schema.contains_key("monthly_limit"));
    }

    #[test]
    fn parses_yaml_document() {
        let yaml = r#"
tables:
  transactions:
    amount: number
    description: string
"#;
        let registry = FieldRegistry::from_document(yaml).unwrap();
        assert_eq!(registry.len(), 1);
        let schema = registry.schema_for("transactions").unwrap();
        assert_eq!(schema["amount"], FieldKind::Number);
        assert_eq!(schema["description"], FieldKind::String);
    }

    #[test]
    fn parses_json_document() {
        let json = r#"{"tables":{"accounts":{"balance":"number"}}}"#;
        let registry = FieldRegistry::from_document(json).unwrap();
        assert_eq!(registry.tables().collect::<Vec<_>>(), vec!["accounts"]);
    }

    #[test]
    fn rejects_unknown_kind() {
        let yaml = "tables:\n  accounts:\n    balance: decimal\n";
        assert!(matches!(
            FieldRegistry::from_document(yaml),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn rejects_empty_table() {
        let yaml = "tables:\n  accounts: {}\n";
        assert!(matches!(
            FieldRegistry::from_document(yaml),
            Err(RegistryError::EmptyTable(t)) if t == "accounts"
        ));
    }
}
