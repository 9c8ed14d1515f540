//! Mock lot source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::source::{CandidateLot, LotSource, SourceError, TrackedEntity};

/// Mock implementation of the LotSource trait.
///
/// Provides controllable behavior for testing:
/// - Per-entity candidate lists
/// - Per-entity or total unavailability
/// - Detail records for partial lots
/// - Recorded calls for assertions
#[derive(Debug, Default, Clone)]
pub struct MockLotSource {
    lots: Arc<RwLock<HashMap<String, Vec<CandidateLot>>>>,
    details: Arc<RwLock<HashMap<String, CandidateLot>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    unavailable: Arc<RwLock<bool>>,
    list_calls: Arc<RwLock<Vec<String>>>,
    detail_calls: Arc<RwLock<Vec<String>>>,
}

impl MockLotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the candidates returned for `entity`.
    pub async fn set_lots(&self, entity: &str, lots: Vec<CandidateLot>) {
        self.lots.write().await.insert(entity.to_string(), lots);
    }

    /// Set the detail record returned for `lot_id`.
    pub async fn set_detail(&self, lot_id: &str, detail: CandidateLot) {
        self.details.write().await.insert(lot_id.to_string(), detail);
    }

    /// Make fetches for `entity` fail until cleared.
    pub async fn fail_entity(&self, entity: &str) {
        self.failing.write().await.insert(entity.to_string());
    }

    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
        *self.unavailable.write().await = false;
    }

    /// Make every fetch fail.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Entity names passed to `list_candidates`, in call order.
    pub async fn list_calls(&self) -> Vec<String> {
        self.list_calls.read().await.clone()
    }

    /// Ids passed to `get_detail`, in call order.
    pub async fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.read().await.clone()
    }
}

#[async_trait]
impl LotSource for MockLotSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_candidates(
        &self,
        entity: &TrackedEntity,
    ) -> Result<Vec<CandidateLot>, SourceError> {
        self.list_calls.write().await.push(entity.name().to_string());

        if *self.unavailable.read().await || self.failing.read().await.contains(entity.name()) {
            return Err(SourceError::ConnectionFailed(format!(
                "mock failure for {}",
                entity
            )));
        }

        Ok(self
            .lots
            .read()
            .await
            .get(entity.name())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_detail(&self, lot_id: &str) -> Result<Option<CandidateLot>, SourceError> {
        self.detail_calls.write().await.push(lot_id.to_string());
        Ok(self.details.read().await.get(lot_id).cloned())
    }
}
