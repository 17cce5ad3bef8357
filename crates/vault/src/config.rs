//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use axum::http::HeaderName;
use serde::Deserialize;
use zeroize::Zeroizing;

/// The base64 key secret, kept out of `Debug` output and zeroed on drop.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub struct KeySecret(Zeroizing<String>);

impl KeySecret {
    /// Borrow the secret for key import. Do not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for KeySecret {
    fn from(s: String) -> Self {
        Self(Zeroizing::new(s))
    }
}

impl std::fmt::Debug for KeySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeySecret([REDACTED])")
    }
}

impl From<&str> for KeySecret {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

/// Validated vault service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base64-encoded AES key (16, 24 or 32 bytes decoded). **Required.**
    pub field_encryption_key: KeySecret,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// HTTP header used to name the table a request's rows belong to.
    #[serde(default = "default_table_header")]
    pub table_header_name: String,

    /// Optional YAML/JSON registry file replacing the built-in table layout.
    #[serde(default)]
    pub registry_path: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// OTLP endpoint for trace export; logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_table_header() -> String {
    "X-Table-Name".into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Move the key secret out, leaving an empty one behind.
    ///
    /// The caller owns the only copy and drops it once the key is imported.
    pub fn take_key_secret(&mut self) -> KeySecret {
        KeySecret::from(std::mem::take(&mut *self.field_encryption_key.0))
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.field_encryption_key.expose().trim().is_empty() {
            anyhow::bail!("FIELD_ENCRYPTION_KEY is required and must not be empty");
        }
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        HeaderName::try_from(self.table_header_name.as_str())
            .context("TABLE_HEADER_NAME is not a valid HTTP header name")?;
        if let Some(path) = &self.registry_path {
            if path.trim().is_empty() {
                anyhow::bail!("REGISTRY_PATH must not be empty when set");
            }
        }
        Ok(())
    }
}
