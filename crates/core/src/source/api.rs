//! Bankruptcy data API client (api-cloud `bankrot.php`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiSourceConfig;

use super::date::is_before;
use super::types::non_empty;
use super::{CandidateLot, LotSource, SourceError, TrackedEntity};

/// HTTP client for the bankruptcy data API.
///
/// Listing uses the configured search type and parameter; detail uses
/// `type=getCase&guid=<id>`. Records wrap most scalars as `{"value": ..}`.
pub struct ApiLotSource {
    client: Client,
    config: ApiSourceConfig,
    min_date: NaiveDate,
}

impl ApiLotSource {
    pub fn new(config: ApiSourceConfig, min_date: NaiveDate) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            config,
            min_date,
        })
    }

    async fn request(&self, params: &[(&str, &str)]) -> Result<Vec<Value>, SourceError> {
        let mut query: Vec<(&str, &str)> = vec![("token", self.config.token.as_str())];
        query.extend_from_slice(params);

        let response = self
            .client
            .get(&self.config.url)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::ApiError(format!("HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        records_from_response(body)
    }
}

#[async_trait]
impl LotSource for ApiLotSource {
    fn name(&self) -> &str {
        "api"
    }

    async fn list_candidates(
        &self,
        entity: &TrackedEntity,
    ) -> Result<Vec<CandidateLot>, SourceError> {
        let records = self
            .request(&[
                ("type", self.config.search_type.as_str()),
                (self.config.search_param.as_str(), entity.name()),
            ])
            .await?;

        let lots: Vec<CandidateLot> = records
            .iter()
            .map(|record| lot_from_record(record, entity.name()))
            .filter(|lot| !is_before(lot.publish_date.as_deref(), self.min_date))
            .collect();

        debug!(entity = %entity, lots = lots.len(), "API listing fetched");
        Ok(lots)
    }

    async fn get_detail(&self, lot_id: &str) -> Result<Option<CandidateLot>, SourceError> {
        let records = self.request(&[("type", "getCase"), ("guid", lot_id)]).await?;

        match records.first() {
            Some(record) => Ok(Some(lot_from_record(record, ""))),
            None => {
                warn!(lot_id = %lot_id, "Case lookup returned no records");
                Ok(None)
            }
        }
    }
}

/// Pull the `rez` record list out of an API response body.
pub(crate) fn records_from_response(body: Value) -> Result<Vec<Value>, SourceError> {
    match body {
        Value::Object(mut map) => {
            if let Some(rez) = map.remove("rez") {
                return match rez {
                    Value::Array(records) => Ok(records),
                    Value::Null => Ok(Vec::new()),
                    record @ Value::Object(_) => Ok(vec![record]),
                    other => Err(SourceError::Parse(format!(
                        "unexpected rez value: {}",
                        other
                    ))),
                };
            }
            match map.get("error").or_else(|| map.get("message")) {
                Some(message) => Err(SourceError::ApiError(
                    scalar_text(message).unwrap_or_default(),
                )),
                None => Ok(Vec::new()),
            }
        }
        Value::Array(records) => Ok(records),
        other => Err(SourceError::Parse(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Build a candidate lot from one API record.
pub(crate) fn lot_from_record(record: &Value, tracked_entity: &str) -> CandidateLot {
    CandidateLot {
        lot_id: field(record, &["guid"]),
        tracked_entity: tracked_entity.to_string(),
        debtor_name: field(record, &["debtorName"]),
        lot_number: field(record, &["lastLegalCasenNumber", "lotNumber"]),
        description: field(record, &["lotDescription", "description"]),
        publish_date: field(record, &["publishDate", "datePublish"]),
        url: field(record, &["url", "link"]),
    }
}

/// First non-blank value among `keys`, unwrapping `{"value": ..}` objects.
fn field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let value = record.get(*key)?;
        match value {
            Value::Object(inner) => inner.get("value").and_then(scalar_text),
            other => scalar_text(other),
        }
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
