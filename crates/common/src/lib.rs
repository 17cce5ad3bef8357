//! Common types, protocol definitions, and errors shared across `ledger-vault` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
