//! Axum HTTP server, routing, and handlers.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Translate transform failures into generic error bodies; no partial
//!   results are ever returned.

pub mod handlers;
pub mod router;
pub mod state;
