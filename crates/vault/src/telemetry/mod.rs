//! Tracing setup: structured JSON logs, plus optional OTLP trace export.
//!
//! # Telemetry invariants
//!
//! - **No field values or key material** may appear in any span attribute or
//!   log field. Log table and field names only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::{init_telemetry, shutdown};
