//! Auction lot sources.
//!
//! This module provides a `LotSource` trait yielding candidate lots per
//! tracked trustee, with two backends: the fedresurs trade-listing page
//! scraper and the bankruptcy data HTTP API.

mod api;
mod date;
mod fedresurs;
mod types;

pub use api::ApiLotSource;
pub use date::{is_before, parse_publish_date};
pub use fedresurs::{parse_listing, FedresursLotSource};
pub use types::*;
