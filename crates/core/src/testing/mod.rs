//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits used
//! by the poll loop, so cycles can be driven without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use bankrot_core::testing::{fixtures, MockDispatcher, MockLotSource};
//!
//! let source = MockLotSource::new();
//! source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;
//!
//! let chat = MockDispatcher::new("chat");
//! // ... run a cycle ...
//! assert_eq!(chat.sent_count().await, 1);
//! ```

mod mock_dispatcher;
mod mock_renderer;
mod mock_source;

pub use mock_dispatcher::{MockDispatcher, RecordedDelivery};
pub use mock_renderer::MockRenderer;
pub use mock_source::MockLotSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::source::{CandidateLot, TrackedEntity};

    /// A complete lot with id, number and debtor.
    pub fn lot(lot_id: &str, entity: &str) -> CandidateLot {
        let mut lot = CandidateLot::new(entity);
        lot.lot_id = Some(lot_id.to_string());
        lot.lot_number = Some(format!("А65-{}/2026", lot_id));
        lot.debtor_name = Some(format!("Должник {}", lot_id));
        lot.publish_date = Some("01.03.2026".to_string());
        lot.url = Some(format!(
            "https://bankrot.fedresurs.ru/TradeCard.aspx?guid={}",
            lot_id
        ));
        lot
    }

    /// A lot without a lot number, which triggers a detail lookup.
    pub fn partial_lot(lot_id: &str, entity: &str) -> CandidateLot {
        let mut lot = CandidateLot::new(entity);
        lot.lot_id = Some(lot_id.to_string());
        lot
    }

    /// A lot the source could not identify.
    pub fn anonymous_lot(entity: &str, lot_number: &str) -> CandidateLot {
        let mut lot = CandidateLot::new(entity);
        lot.lot_number = Some(lot_number.to_string());
        lot
    }

    /// Tracked entities from names.
    pub fn entities(names: &[&str]) -> Vec<TrackedEntity> {
        names.iter().copied().map(TrackedEntity::from).collect()
    }
}
