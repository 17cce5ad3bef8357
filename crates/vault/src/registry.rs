//! Startup loading of the field registry.
//!
//! The built-in table layout is used unless `REGISTRY_PATH` points at a YAML or
//! JSON document. The registry is read once; changing it requires a restart.

use anyhow::{Context, Result};
use fieldcrypt::FieldRegistry;
use tracing::info;

use crate::config::Config;

/// Build the registry the service will use for its whole lifetime.
///
/// # Errors
///
/// Returns an error if the configured file cannot be read or parsed.
pub async fn load(cfg: &Config) -> Result<FieldRegistry> {
    let Some(path) = cfg.registry_path.as_deref() else {
        let registry = FieldRegistry::builtin();
        info!(tables = registry.len(), "using built-in field registry");
        return Ok(registry);
    };

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read registry file {path}"))?;
    let registry = FieldRegistry::from_document(&text)
        .with_context(|| format!("failed to parse registry file {path}"))?;

    info!(path = %path, tables = registry.len(), "loaded field registry");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcrypt::FieldKind;

    fn config_with(path: Option<String>) -> Config {
        serde_json::from_value(serde_json::json!({
            "field_encryption_key": "QkJCQkJCQkJCQkJCQkJCQg==",
            "registry_path": path,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn defaults_to_builtin() {
        let registry = load(&config_with(None)).await.unwrap();
        assert_eq!(registry, FieldRegistry::builtin());
    }

    #[tokio::test]
    async fn reads_registry_file() {
        let path = std::env::temp_dir().join(format!("ledger-vault-registry-{}.yaml", std::process::id()));
        tokio::fs::write(&path, "tables:\n  payouts:\n    amount: number\n")
            .await
            .unwrap();

        let registry = load(&config_with(Some(path.display().to_string()))).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.schema_for("payouts").unwrap()["amount"],
            FieldKind::Number
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = load(&config_with(Some("/nonexistent/registry.yaml".into())))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/registry.yaml"));
    }
}
