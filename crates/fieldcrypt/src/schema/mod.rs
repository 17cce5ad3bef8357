//! Field schema registry: which fields of which tables hold ciphertext at rest.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** This module must not import anything from
//!   `crate::crypto`.
//! - The registry is immutable once built; callers share it behind an `Arc`.

mod builtin;
pub mod registry;

pub use registry::{FieldKind, FieldRegistry, RegistryError, TableSchema};
