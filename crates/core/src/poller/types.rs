//! Types for the poll loop.

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a whole poll cycle.
#[derive(Debug, Error)]
pub enum PollError {
    /// Every tracked entity's fetch failed.
    #[error("lot source unavailable: all {failed} entity fetches failed")]
    SourceUnavailable { failed: usize },
}

/// Poll loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Starting,
    Polling,
    Sleeping,
    Stopping,
    Stopped,
}

impl PollState {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            PollState::Starting => "starting",
            PollState::Polling => "polling",
            PollState::Sleeping => "sleeping",
            PollState::Stopping => "stopping",
            PollState::Stopped => "stopped",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            PollState::Starting => 0,
            PollState::Polling => 1,
            PollState::Sleeping => 2,
            PollState::Stopping => 3,
            PollState::Stopped => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => PollState::Starting,
            1 => PollState::Polling,
            2 => PollState::Sleeping,
            3 => PollState::Stopping,
            _ => PollState::Stopped,
        }
    }
}

/// Counters shared between the poll loop and readers such as the HTTP
/// status endpoint. Readers only ever load atomics.
#[derive(Debug)]
pub struct PollStats {
    state: AtomicU8,
    tracked_entities: AtomicUsize,
    seen_lots: AtomicUsize,
    cycles: AtomicU64,
    lots_dispatched: AtomicU64,
    lot_failures: AtomicU64,
    source_failures: AtomicU64,
    /// Unix seconds of the last finished cycle; 0 when none has finished.
    last_cycle_at: AtomicI64,
}

impl Default for PollStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PollStats {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PollState::Starting.to_u8()),
            tracked_entities: AtomicUsize::new(0),
            seen_lots: AtomicUsize::new(0),
            cycles: AtomicU64::new(0),
            lots_dispatched: AtomicU64::new(0),
            lot_failures: AtomicU64::new(0),
            source_failures: AtomicU64::new(0),
            last_cycle_at: AtomicI64::new(0),
        }
    }

    /// Stats for a process that serves status without polling.
    pub fn inactive(tracked_entities: usize) -> Self {
        let stats = Self::new();
        stats.set_state(PollState::Stopped);
        stats.set_tracked_entities(tracked_entities);
        stats
    }

    pub fn state(&self) -> PollState {
        PollState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub(crate) fn set_state(&self, state: PollState) {
        self.state.store(state.to_u8(), Ordering::Relaxed);
    }

    pub(crate) fn set_tracked_entities(&self, count: usize) {
        self.tracked_entities.store(count, Ordering::Relaxed);
    }

    pub(crate) fn set_seen_lots(&self, count: usize) {
        self.seen_lots.store(count, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.lots_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lot_failure(&self) {
        self.lot_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_source_failure(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cycle(&self, at: DateTime<Utc>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_at.store(at.timestamp(), Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> PollStatus {
        let state = self.state();
        let last = self.last_cycle_at.load(Ordering::Relaxed);

        PollStatus {
            running: !matches!(state, PollState::Stopping | PollState::Stopped),
            state,
            tracked_entities: self.tracked_entities.load(Ordering::Relaxed),
            seen_lots: self.seen_lots.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            lots_dispatched: self.lots_dispatched.load(Ordering::Relaxed),
            lot_failures: self.lot_failures.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            last_cycle_at: if last == 0 {
                None
            } else {
                DateTime::from_timestamp(last, 0)
            },
        }
    }
}

/// Current status of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollStatus {
    pub running: bool,
    pub state: PollState,
    pub tracked_entities: usize,
    pub seen_lots: usize,
    /// Cycles finished, including ones that ended in backoff.
    pub cycles: u64,
    pub lots_dispatched: u64,
    pub lot_failures: u64,
    /// Individual entity fetches that failed.
    pub source_failures: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub entities: usize,
    pub entities_failed: usize,
    pub candidates: usize,
    pub skipped_seen: usize,
    pub dispatched: usize,
    pub failed: usize,
    /// Stop was requested before every candidate was handled.
    pub interrupted: bool,
    /// The seen set was written successfully.
    pub saved: bool,
}
