//! Liveness HTTP surface for the lot watcher.
//!
//! The binary wires configuration and collaborators together; this library
//! holds the parts the integration tests drive in-process.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
