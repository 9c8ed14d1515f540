//! Types for the lot source system.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::date::parse_publish_date;

/// A trustee whose lots are watched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedEntity(String);

impl TrackedEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackedEntity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One auction lot as reported by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLot {
    /// Stable identifier (fedresurs guid). Lots without one are never deduplicated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_id: Option<String>,
    /// Trustee the lot was found under.
    pub tracked_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debtor_name: Option<String>,
    /// Case or lot number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publish date as printed by the source; may not parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    /// Link to the lot page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CandidateLot {
    pub fn new(tracked_entity: impl Into<String>) -> Self {
        Self {
            lot_id: None,
            tracked_entity: tracked_entity.into(),
            debtor_name: None,
            lot_number: None,
            description: None,
            publish_date: None,
            url: None,
        }
    }

    /// A partial candidate lacks the lot number and benefits from a detail lookup.
    pub fn is_partial(&self) -> bool {
        self.lot_number.is_none()
    }

    pub fn lot_number_or_na(&self) -> &str {
        self.lot_number.as_deref().unwrap_or("N/A")
    }

    pub fn debtor_name_or_na(&self) -> &str {
        self.debtor_name.as_deref().unwrap_or("N/A")
    }

    /// Parsed publish date, if present and recognisable.
    pub fn published_on(&self) -> Option<NaiveDate> {
        self.publish_date.as_deref().and_then(parse_publish_date)
    }

    /// Fill in fields from a detail record. Detail values win; provenance is kept.
    pub fn merge_detail(self, detail: CandidateLot) -> CandidateLot {
        CandidateLot {
            lot_id: self.lot_id.or(detail.lot_id),
            tracked_entity: self.tracked_entity,
            debtor_name: detail.debtor_name.or(self.debtor_name),
            lot_number: detail.lot_number.or(self.lot_number),
            description: detail.description.or(self.description),
            publish_date: detail.publish_date.or(self.publish_date),
            url: self.url.or(detail.url),
        }
    }
}

/// Trim a scraped value, mapping blank text to `None`.
pub(crate) fn non_empty(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Errors that can occur while fetching lots.
///
/// Every variant means the source is unavailable for now; the poll loop
/// treats them as zero lots and tries again next cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Lot source connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Lot source API error: {0}")]
    ApiError(String),

    #[error("Failed to parse lot source response: {0}")]
    Parse(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_connect() {
            SourceError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::ApiError(e.to_string())
        }
    }
}

/// Trait for lot source backends.
#[async_trait]
pub trait LotSource: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Candidate lots currently listed for `entity`.
    async fn list_candidates(
        &self,
        entity: &TrackedEntity,
    ) -> Result<Vec<CandidateLot>, SourceError>;

    /// Full record for a lot. Backends without a detail endpoint return `None`.
    async fn get_detail(&self, _lot_id: &str) -> Result<Option<CandidateLot>, SourceError> {
        Ok(None)
    }
}
