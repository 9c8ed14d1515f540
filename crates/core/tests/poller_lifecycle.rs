//! Poll loop integration tests.
//!
//! These tests drive whole cycles through `LotPoller` with mock collaborators:
//! fetch -> claim -> chat -> render -> email -> persist

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::watch;

use bankrot_core::{
    config::PollerConfig,
    seen::SeenStore,
    testing::{fixtures, MockDispatcher, MockLotSource, MockRenderer},
    LotPoller, PollError, PollState,
};

/// Test helper holding the mocks and a scratch directory.
struct TestHarness {
    source: Arc<MockLotSource>,
    chat: Arc<MockDispatcher>,
    mail: Arc<MockDispatcher>,
    renderer: Arc<MockRenderer>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let renderer = Arc::new(MockRenderer::new(temp_dir.path()));

        Self {
            source: Arc::new(MockLotSource::new()),
            chat: Arc::new(MockDispatcher::new("chat")),
            mail: Arc::new(MockDispatcher::new("email")),
            renderer,
            temp_dir,
        }
    }

    fn seen_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("seen_cases.json")
    }

    fn config(&self) -> PollerConfig {
        PollerConfig {
            interval_secs: 1,
            error_backoff_secs: 1,
            seen_file: self.seen_path(),
            max_cycles: None,
        }
    }

    async fn poller_with(&self, config: PollerConfig, entities: &[&str]) -> LotPoller {
        LotPoller::new(
            config,
            fixtures::entities(entities),
            self.source.clone(),
            self.renderer.clone(),
            SeenStore::new(self.seen_path()),
        )
        .await
        .with_chat(self.chat.clone())
        .with_mail(self.mail.clone())
    }

    async fn poller(&self, entities: &[&str]) -> LotPoller {
        self.poller_with(self.config(), entities).await
    }

    fn saved_ids(&self) -> Vec<String> {
        let content = std::fs::read_to_string(self.seen_path()).expect("seen file written");
        serde_json::from_str(&content).expect("seen file is a JSON array")
    }
}

fn no_stop() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[tokio::test]
async fn test_same_lot_twice_in_one_cycle_dispatches_once() {
    let h = TestHarness::new();
    h.source
        .set_lots("A", vec![fixtures::lot("L1", "A"), fixtures::lot("L1", "A")])
        .await;

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = no_stop();
    let report = poller.run_cycle(&stop).await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.skipped_seen, 1);
    assert_eq!(h.chat.texts().await, vec!["Новый лот от A: А65-L1/2026"]);
    assert_eq!(h.mail.sent_count().await, 1);
}

#[tokio::test]
async fn test_repeat_lot_in_later_cycle_and_new_lot_for_other_entity() {
    let h = TestHarness::new();
    let mut poller = h.poller(&["A", "B"]).await;
    let (_tx, stop) = no_stop();

    // Cycle 1: L1 for A.
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;
    let first = poller.run_cycle(&stop).await.unwrap();
    assert_eq!(first.dispatched, 1);
    assert_eq!(h.chat.sent_count().await, 1);

    // Cycle 2: L1 again, plus L2 for B.
    h.source.set_lots("B", vec![fixtures::lot("L2", "B")]).await;
    let second = poller.run_cycle(&stop).await.unwrap();
    assert_eq!(second.dispatched, 1);
    assert_eq!(second.skipped_seen, 1);

    let texts = h.chat.texts().await;
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], "Новый лот от A: А65-L1/2026");
    assert_eq!(texts[1], "Новый лот от B: А65-L2/2026");
    assert_eq!(h.mail.sent_count().await, 2);

    let mut saved = h.saved_ids();
    saved.sort();
    assert_eq!(saved, vec!["L1", "L2"]);
}

#[tokio::test]
async fn test_lot_without_id_is_dispatched_every_time() {
    let h = TestHarness::new();
    h.source
        .set_lots("A", vec![fixtures::anonymous_lot("A", "А65-7/2026")])
        .await;

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = no_stop();
    poller.run_cycle(&stop).await.unwrap();
    poller.run_cycle(&stop).await.unwrap();

    assert_eq!(h.chat.sent_count().await, 2);
    assert_eq!(h.mail.sent_count().await, 2);
    assert!(poller.seen().is_empty());
}

#[tokio::test]
async fn test_failed_entity_does_not_abort_cycle() {
    let h = TestHarness::new();
    h.source.fail_entity("A").await;
    h.source.set_lots("B", vec![fixtures::lot("L2", "B")]).await;
    h.source.set_lots("C", vec![fixtures::lot("L3", "C")]).await;

    let mut poller = h.poller(&["A", "B", "C"]).await;
    let stats = poller.stats();
    let (_tx, stop) = no_stop();
    let report = poller.run_cycle(&stop).await.unwrap();

    assert_eq!(report.entities, 3);
    assert_eq!(report.entities_failed, 1);
    assert_eq!(report.dispatched, 2);
    assert!(report.saved);

    let status = stats.snapshot();
    assert_eq!(status.source_failures, 1);
    assert_eq!(status.lots_dispatched, 2);
    assert_eq!(status.cycles, 1);
}

#[tokio::test]
async fn test_total_source_outage_is_cycle_error() {
    let h = TestHarness::new();
    h.source.set_unavailable(true).await;

    let mut poller = h.poller(&["A", "B"]).await;
    let (_tx, stop) = no_stop();
    let result = poller.run_cycle(&stop).await;

    assert!(matches!(
        result,
        Err(PollError::SourceUnavailable { failed: 2 })
    ));
    assert_eq!(h.chat.sent_count().await, 0);
    assert_eq!(poller.stats().snapshot().source_failures, 2);
}

#[tokio::test]
async fn test_failed_dispatch_is_not_retried() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;
    h.chat.set_failing(true).await;

    let mut poller = h.poller(&["A"]).await;
    let stats = poller.stats();
    let (_tx, stop) = no_stop();

    let first = poller.run_cycle(&stop).await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(h.saved_ids(), vec!["L1"]);

    h.chat.set_failing(false).await;
    let second = poller.run_cycle(&stop).await.unwrap();
    assert_eq!(second.skipped_seen, 1);
    assert_eq!(second.dispatched, 0);

    // One attempt only, made in the first cycle.
    assert_eq!(h.chat.sent_count().await, 1);
    assert_eq!(stats.snapshot().lot_failures, 1);
}

#[tokio::test]
async fn test_corrupt_seen_file_starts_empty() {
    let h = TestHarness::new();
    std::fs::write(h.seen_path(), "{not json").unwrap();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;

    let mut poller = h.poller(&["A"]).await;
    assert!(poller.seen().is_empty());

    let (_tx, stop) = no_stop();
    let report = poller.run_cycle(&stop).await.unwrap();
    assert_eq!(report.dispatched, 1);
    assert_eq!(h.saved_ids(), vec!["L1"]);
}

#[tokio::test]
async fn test_seen_set_survives_restart() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;
    let (_tx, stop) = no_stop();

    {
        let mut poller = h.poller(&["A"]).await;
        poller.run_cycle(&stop).await.unwrap();
    }

    let mut restarted = h.poller(&["A"]).await;
    assert!(restarted.seen().contains("L1"));
    assert_eq!(restarted.stats().snapshot().seen_lots, 1);

    let report = restarted.run_cycle(&stop).await.unwrap();
    assert_eq!(report.skipped_seen, 1);
    assert_eq!(h.chat.sent_count().await, 1);
}

#[tokio::test]
async fn test_render_failure_skips_email_but_keeps_claim() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;
    h.renderer.set_failing(true);

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = no_stop();
    let report = poller.run_cycle(&stop).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(h.chat.sent_count().await, 1);
    assert_eq!(h.mail.sent_count().await, 0);
    assert!(poller.seen().contains("L1"));
}

#[tokio::test]
async fn test_rendered_file_exists_during_send_and_is_removed_after() {
    let h = TestHarness::new();
    h.source
        .set_lots("A", vec![fixtures::lot("L1", "A"), fixtures::lot("L2", "A")])
        .await;
    h.mail.set_failing(true).await;

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = no_stop();
    poller.run_cycle(&stop).await.unwrap();

    let sent = h.mail.sent().await;
    assert_eq!(sent.len(), 2);
    for delivery in &sent {
        assert!(delivery.attachment_present);
        let attachment = delivery.notification.attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, "Заявка.pdf");
        assert!(delivery.notification.subject.starts_with("Заявка на А65-"));
    }

    for path in h.renderer.paths() {
        assert!(!path.exists(), "{} should be removed", path.display());
    }
}

#[tokio::test]
async fn test_slow_render_does_not_block_the_runtime() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;
    h.renderer.set_delay(Duration::from_millis(500));

    // Single-threaded test runtime: the ticker only advances while the
    // poller yields.
    let ticks = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let ticker = {
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ticks.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        })
    };

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = no_stop();
    let report = poller.run_cycle(&stop).await.unwrap();
    ticker.abort();

    assert_eq!(report.dispatched, 1);
    assert_eq!(h.mail.sent_count().await, 1);
    assert!(
        ticks.load(std::sync::atomic::Ordering::Relaxed) >= 10,
        "other tasks should run while a document renders"
    );
}

#[tokio::test]
async fn test_partial_lot_is_enriched_before_dispatch() {
    let h = TestHarness::new();
    h.source
        .set_lots("A", vec![fixtures::partial_lot("G1", "A")])
        .await;
    h.source.set_detail("G1", fixtures::lot("G1", "")).await;

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = no_stop();
    poller.run_cycle(&stop).await.unwrap();

    assert_eq!(h.source.detail_calls().await, vec!["G1"]);
    assert_eq!(h.chat.texts().await, vec!["Новый лот от A: А65-G1/2026"]);

    let rendered = h.renderer.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].0, "A");
    assert_eq!(rendered[0].1.tracked_entity, "A");
}

#[tokio::test]
async fn test_complete_lot_skips_detail_lookup() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = no_stop();
    poller.run_cycle(&stop).await.unwrap();

    assert!(h.source.detail_calls().await.is_empty());
}

#[tokio::test]
async fn test_stop_requested_leaves_lots_unclaimed() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;

    let mut poller = h.poller(&["A"]).await;
    let (_tx, stop) = watch::channel(true);
    let report = poller.run_cycle(&stop).await.unwrap();

    assert!(report.interrupted);
    assert_eq!(report.dispatched, 0);
    assert!(!poller.seen().contains("L1"));
}

#[tokio::test]
async fn test_channels_are_optional() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;

    let mut poller = LotPoller::new(
        h.config(),
        fixtures::entities(&["A"]),
        h.source.clone(),
        h.renderer.clone(),
        SeenStore::new(h.seen_path()),
    )
    .await
    .with_chat(h.chat.clone());

    let (_tx, stop) = no_stop();
    let report = poller.run_cycle(&stop).await.unwrap();

    assert_eq!(report.dispatched, 1);
    assert_eq!(h.chat.sent_count().await, 1);
    assert!(h.renderer.rendered().is_empty());
}

#[tokio::test]
async fn test_run_honours_max_cycles() {
    let h = TestHarness::new();
    h.source.set_lots("A", vec![fixtures::lot("L1", "A")]).await;

    let config = PollerConfig {
        interval_secs: 0,
        max_cycles: Some(2),
        ..h.config()
    };
    let poller = h.poller_with(config, &["A"]).await;
    let stats = poller.stats();
    let (_tx, stop) = no_stop();

    tokio::time::timeout(Duration::from_secs(10), poller.run(stop))
        .await
        .expect("poll loop should stop after two cycles");

    let status = stats.snapshot();
    assert_eq!(status.state, PollState::Stopped);
    assert!(!status.running);
    assert_eq!(status.cycles, 2);
    assert_eq!(status.lots_dispatched, 1);
    assert!(status.last_cycle_at.is_some());
    assert_eq!(h.saved_ids(), vec!["L1"]);
}

#[tokio::test]
async fn test_run_stops_promptly_while_sleeping() {
    let h = TestHarness::new();
    let config = PollerConfig {
        interval_secs: 3600,
        ..h.config()
    };
    let poller = h.poller_with(config, &["A"]).await;
    let stats = poller.stats();
    let (tx, stop) = no_stop();

    let handle = tokio::spawn(poller.run(stop));

    // Wait for the first cycle to finish.
    for _ in 0..100 {
        if stats.state() == PollState::Sleeping {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(stats.state(), PollState::Sleeping);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poll loop should stop without waiting out the interval")
        .unwrap();

    assert_eq!(stats.state(), PollState::Stopped);
    assert!(h.seen_path().exists());
}

#[tokio::test]
async fn test_run_backs_off_after_outage() {
    let h = TestHarness::new();
    h.source.set_unavailable(true).await;

    let config = PollerConfig {
        interval_secs: 0,
        error_backoff_secs: 0,
        max_cycles: Some(3),
        ..h.config()
    };
    let poller = h.poller_with(config, &["A"]).await;
    let stats = poller.stats();
    let (_tx, stop) = no_stop();

    tokio::time::timeout(Duration::from_secs(10), poller.run(stop))
        .await
        .expect("outages must not stall the loop");

    let status = stats.snapshot();
    assert_eq!(status.cycles, 3);
    assert_eq!(status.source_failures, 3);
    assert_eq!(status.state, PollState::Stopped);
    assert_eq!(h.source.list_calls().await.len(), 3);
}

#[tokio::test]
async fn test_outage_waits_error_backoff_not_interval() {
    let h = TestHarness::new();
    h.source.set_unavailable(true).await;

    // A zero interval would poll again at once; only the backoff may delay it.
    let config = PollerConfig {
        interval_secs: 0,
        error_backoff_secs: 3600,
        ..h.config()
    };
    let poller = h.poller_with(config, &["A"]).await;
    let stats = poller.stats();
    let (tx, stop) = no_stop();

    let handle = tokio::spawn(poller.run(stop));

    for _ in 0..100 {
        if stats.state() == PollState::Sleeping {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(stats.state(), PollState::Sleeping);

    // The source is back, but the loop is still backing off.
    h.source.set_unavailable(false).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.source.list_calls().await.len(), 1);
    assert_eq!(stats.snapshot().cycles, 1);
    assert_eq!(stats.snapshot().source_failures, 1);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poll loop should stop during the backoff")
        .unwrap();
}

#[tokio::test]
async fn test_healthy_cycles_use_interval_not_backoff() {
    let h = TestHarness::new();
    let config = PollerConfig {
        interval_secs: 0,
        error_backoff_secs: 3600,
        max_cycles: Some(3),
        ..h.config()
    };
    let poller = h.poller_with(config, &["A"]).await;
    let (_tx, stop) = no_stop();

    tokio::time::timeout(Duration::from_secs(10), poller.run(stop))
        .await
        .expect("healthy cycles must not wait out the error backoff");

    assert_eq!(h.source.list_calls().await.len(), 3);
}
