//! Durable record of lot identifiers that were already processed.
//!
//! The poll loop loads the set once at startup, claims ids in memory as lots
//! are picked up and writes the whole set back after every cycle.

mod set;
mod store;

pub use set::SeenSet;
pub use store::{SeenStore, StoreError};
