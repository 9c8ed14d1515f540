//! The poll loop.
//!
//! `LotPoller` fetches candidate lots for every tracked trustee, claims new
//! lot ids in the seen set before dispatching them, and persists the set
//! after each cycle. Progress is published through `PollStats` for the
//! liveness endpoint.

mod runner;
mod types;

pub use runner::LotPoller;
pub use types::*;
