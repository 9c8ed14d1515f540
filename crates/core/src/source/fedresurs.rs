//! Fedresurs trade-listing page scraper.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::FedresursConfig;

use super::api::ApiLotSource;
use super::date::is_before;
use super::types::non_empty;
use super::{CandidateLot, LotSource, SourceError, TrackedEntity};

const ITEM_SELECTOR: &str = r#".trade-item, .lot-item, [class*="trade"], [class*="lot"]"#;
const DEBTOR_SELECTOR: &str = r#".debtor-name, [class*="debtor"]"#;
const LOT_NUMBER_SELECTOR: &str = r#".lot-number, [class*="lot"]"#;
const DESCRIPTION_SELECTOR: &str = r#".description, [class*="desc"]"#;
const DATE_SELECTOR: &str = r#".date, [class*="date"], [class*="publish"]"#;
const LINK_SELECTOR: &str = "a[href]";

static GUID_IN_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"guid=([a-fA-F0-9-]+)").expect("valid regex"));

/// Scrapes the public trade listing, one search page per trustee.
pub struct FedresursLotSource {
    client: Client,
    config: FedresursConfig,
    min_date: NaiveDate,
    last_request: Arc<Mutex<Option<Instant>>>,
    detail: Option<Arc<ApiLotSource>>,
}

impl FedresursLotSource {
    /// Create a new scraper. Lots published before `min_date` are dropped.
    pub fn new(config: FedresursConfig, min_date: NaiveDate) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            config,
            min_date,
            last_request: Arc::new(Mutex::new(None)),
            detail: None,
        })
    }

    /// Resolve partial lots through the data API's case lookup.
    pub fn with_detail_source(mut self, detail: Arc<ApiLotSource>) -> Self {
        self.detail = Some(detail);
        self
    }

    fn search_url(&self, entity: &TrackedEntity) -> String {
        format!(
            "{}/trades?search={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(entity.name())
        )
    }

    /// Keep page requests at least `request_delay_ms` apart.
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let spacing = Duration::from_millis(self.config.request_delay_ms);

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < spacing {
                sleep(spacing - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[async_trait]
impl LotSource for FedresursLotSource {
    fn name(&self) -> &str {
        "fedresurs"
    }

    async fn list_candidates(
        &self,
        entity: &TrackedEntity,
    ) -> Result<Vec<CandidateLot>, SourceError> {
        self.wait_for_rate_limit().await;

        let url = self.search_url(entity);
        debug!(entity = %entity, "Fetching trade listing");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(SourceError::ApiError(format!("HTTP {} for {}", status, url)));
        }
        let body = response.text().await?;

        let lots: Vec<CandidateLot> = parse_listing(&body, entity, &self.config.base_url)?
            .into_iter()
            .filter(|lot| !is_before(lot.publish_date.as_deref(), self.min_date))
            .collect();

        debug!(entity = %entity, lots = lots.len(), "Trade listing parsed");
        Ok(lots)
    }

    async fn get_detail(&self, lot_id: &str) -> Result<Option<CandidateLot>, SourceError> {
        match &self.detail {
            Some(api) => api.get_detail(lot_id).await,
            None => Ok(None),
        }
    }
}

struct ListingSelectors {
    item: Selector,
    debtor: Selector,
    lot_number: Selector,
    description: Selector,
    date: Selector,
    link: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self, SourceError> {
        Ok(Self {
            item: selector(ITEM_SELECTOR)?,
            debtor: selector(DEBTOR_SELECTOR)?,
            lot_number: selector(LOT_NUMBER_SELECTOR)?,
            description: selector(DESCRIPTION_SELECTOR)?,
            date: selector(DATE_SELECTOR)?,
            link: selector(LINK_SELECTOR)?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector {}: {:?}", css, e)))
}

/// How a matched element relates to the links on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemRole {
    /// Innermost matched element around its first link: one lot.
    Card,
    /// Contains no link at all.
    Bare,
    /// Its first link belongs to a nested card, e.g. a `trades-list` wrapper.
    Wrapper,
}

/// Extract candidate lots from a trade listing page.
///
/// Every card (the innermost matched element around a link) is a lot, so a
/// wrapper whose class also matches does not swallow the cards inside it.
/// Linkless elements inside a card or inside another linkless element are
/// part of it, not lots of their own. Items with no recognisable content
/// are skipped and repeated guids are kept once. No date filtering happens
/// here.
pub fn parse_listing(
    html: &str,
    entity: &TrackedEntity,
    base_url: &str,
) -> Result<Vec<CandidateLot>, SourceError> {
    let selectors = ListingSelectors::new()?;
    let document = Html::parse_document(html);

    let items: Vec<ElementRef<'_>> = document.select(&selectors.item).collect();
    let item_ids: HashSet<_> = items.iter().map(|item| item.id()).collect();
    let roles: HashMap<_, _> = items
        .iter()
        .map(|item| {
            let role = match item.select(&selectors.link).next() {
                None => ItemRole::Bare,
                Some(link) => {
                    let owner = link.ancestors().find(|a| item_ids.contains(&a.id()));
                    if owner.map(|a| a.id()) == Some(item.id()) {
                        ItemRole::Card
                    } else {
                        ItemRole::Wrapper
                    }
                }
            };
            (item.id(), role)
        })
        .collect();

    let mut lots = Vec::new();
    let mut seen_ids = HashSet::new();
    for item in items {
        match roles.get(&item.id()) {
            Some(ItemRole::Card) => {}
            Some(ItemRole::Bare) => {
                let enclosed = item.ancestors().any(|a| {
                    matches!(roles.get(&a.id()), Some(ItemRole::Card | ItemRole::Bare))
                });
                if enclosed {
                    continue;
                }
            }
            Some(ItemRole::Wrapper) | None => continue,
        }

        let url = item
            .select(&selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_url(base_url, href));

        let lot = CandidateLot {
            lot_id: url.as_deref().and_then(guid_from_url),
            tracked_entity: entity.name().to_string(),
            debtor_name: first_text(&item, &selectors.debtor),
            lot_number: first_text(&item, &selectors.lot_number),
            description: first_text(&item, &selectors.description),
            publish_date: first_text(&item, &selectors.date),
            url,
        };

        if lot.url.is_none()
            && lot.debtor_name.is_none()
            && lot.lot_number.is_none()
            && lot.description.is_none()
        {
            continue;
        }
        if let Some(id) = &lot.lot_id {
            if !seen_ids.insert(id.clone()) {
                continue;
            }
        }
        lots.push(lot);
    }

    Ok(lots)
}

fn first_text(item: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .and_then(|e| non_empty(e.text().collect::<String>()))
}

fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}

fn guid_from_url(url: &str) -> Option<String> {
    GUID_IN_URL
        .captures(url)
        .map(|caps| caps[1].to_lowercase())
}
