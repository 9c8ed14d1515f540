//! Common test utilities for the HTTP surface.
//!
//! This module provides a test fixture that builds the router in-process
//! around shared poll stats, so handlers can be exercised without binding
//! a port.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use bankrot_core::{Config, PollStats, SourceBackend};
use bankrot_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use bankrot_core::testing::fixtures;

/// Test fixture wrapping the router and the stats it reports.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Stats shown by `/status`
    pub stats: Arc<PollStats>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

impl TestFixture {
    /// A polling server with default config and fresh stats.
    pub fn new() -> Self {
        Self::with_stats(Config::default(), Arc::new(PollStats::new()), true)
    }

    /// A server whose lot source is disabled.
    pub fn endpoint_only() -> Self {
        let mut config = Config::default();
        config.source.backend = SourceBackend::Disabled;
        let stats = Arc::new(PollStats::inactive(config.tracking.trustees.len()));
        Self::with_stats(config, stats, false)
    }

    pub fn with_stats(config: Config, stats: Arc<PollStats>, polling: bool) -> Self {
        let state = Arc::new(AppState::new(config, Arc::clone(&stats), polling));
        Self {
            router: create_router(state),
            stats,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).to_string(),
        }
    }
}
