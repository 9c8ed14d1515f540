//! In-process tests for the liveness HTTP surface.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use tempfile::TempDir;
use tokio::sync::watch;

use bankrot_core::{
    config::{PollerConfig, TelegramConfig},
    testing::{MockDispatcher, MockLotSource, MockRenderer},
    Config, LotPoller, SeenStore,
};
use common::{fixtures, TestFixture};

#[tokio::test]
async fn test_root_and_health_report_liveness() {
    let fixture = TestFixture::new();

    for path in ["/", "/health"] {
        let response = fixture.get(path).await;
        assert_eq!(response.status, StatusCode::OK, "{}", path);
        assert_eq!(response.body, "BankrotWatch is running");
        assert!(response
            .content_type
            .as_deref()
            .unwrap_or_default()
            .starts_with("text/plain"));
    }
}

#[tokio::test]
async fn test_status_before_first_cycle() {
    let fixture = TestFixture::new();

    let response = fixture.get("/status").await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["status"], "running");
    assert_eq!(json["service"], "BankrotWatch");
    assert_eq!(json["running"], true);
    assert_eq!(json["polling"], true);
    assert_eq!(json["state"], "starting");
    assert_eq!(json["seen_lots"], 0);
    assert_eq!(json["cycles"], 0);
    assert!(json["last_cycle_at"].is_null());
}

#[tokio::test]
async fn test_status_reflects_poll_cycles() {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(MockLotSource::new());
    source
        .set_lots(
            "A",
            vec![fixtures::lot("L1", "A"), fixtures::lot("L2", "A")],
        )
        .await;
    source.fail_entity("B").await;

    let config = PollerConfig {
        seen_file: temp_dir.path().join("seen.json"),
        ..Default::default()
    };
    let mut poller = LotPoller::new(
        config,
        fixtures::entities(&["A", "B"]),
        source,
        Arc::new(MockRenderer::new(temp_dir.path())),
        SeenStore::new(temp_dir.path().join("seen.json")),
    )
    .await
    .with_chat(Arc::new(MockDispatcher::new("chat")));

    let fixture = TestFixture::with_stats(Config::default(), poller.stats(), true);
    let (_tx, stop) = watch::channel(false);
    poller.run_cycle(&stop).await.unwrap();

    let json = fixture.get("/status").await.json();
    assert_eq!(json["tracked_entities"], 2);
    assert_eq!(json["seen_lots"], 2);
    assert_eq!(json["lots_dispatched"], 2);
    assert_eq!(json["lot_failures"], 0);
    assert_eq!(json["source_failures"], 1);
    assert_eq!(json["cycles"], 1);
    assert!(json["last_cycle_at"].is_string());
}

#[tokio::test]
async fn test_status_in_endpoint_only_mode() {
    let fixture = TestFixture::endpoint_only();

    let json = fixture.get("/status").await.json();
    assert_eq!(json["running"], true);
    assert_eq!(json["polling"], false);
    assert_eq!(json["state"], "stopped");
    assert_eq!(json["tracked_entities"], 6);
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let mut config = Config::default();
    config.telegram = Some(TelegramConfig {
        bot_token: "123456:super-secret-token".to_string(),
        chat_id: "-100777".to_string(),
        api_base: "https://api.telegram.org".to_string(),
        timeout_secs: 30,
    });
    let fixture = TestFixture::with_stats(
        config,
        Arc::new(bankrot_core::PollStats::new()),
        true,
    );

    let response = fixture.get("/config").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("super-secret-token"));

    let json = response.json();
    assert_eq!(json["server"]["port"], 10000);
    assert_eq!(json["telegram"]["bot_token_configured"], true);
    assert_eq!(json["source"]["backend"], "fedresurs");
    assert!(json.get("applicant").is_none());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/health").await;

    let response = fixture.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("bankrot_http_requests_total"));
    assert!(response.body.contains("path=\"/health\""));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let fixture = TestFixture::new();
    let response = fixture.get("/lots").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
