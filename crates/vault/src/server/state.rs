//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use fieldcrypt::RowTransform;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-backed) so that Axum can clone the
/// state for each request without copying the registry or the key.
#[derive(Clone)]
pub struct AppState {
    /// Registry-driven transform holding the imported field key.
    pub transform: RowTransform,
    /// Name of the HTTP header used to identify the table of each request.
    pub table_header_name: Arc<String>,
}

impl AppState {
    /// Create a new [`AppState`] from the transform and header name.
    pub fn new(transform: RowTransform, table_header_name: String) -> Self {
        Self {
            transform,
            table_header_name: Arc::new(table_header_name),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use fieldcrypt::{FieldKey, FieldRegistry};

    /// State over `registry` with a fixed key, for handler and router tests.
    pub fn state_with(registry: FieldRegistry) -> AppState {
        let key = FieldKey::from_bytes(&[0x42u8; 32]).unwrap();
        AppState::new(
            RowTransform::new(Arc::new(registry), Arc::new(key)),
            "X-Table-Name".into(),
        )
    }

    pub fn state() -> AppState {
        state_with(FieldRegistry::builtin())
    }
}
