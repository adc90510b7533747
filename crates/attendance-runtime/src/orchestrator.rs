//! Async watch orchestrator.
//!
//! Runs a [`DataManager`] in a tokio task, checking the workbook on a fixed
//! interval and sending a [`Snapshot`] through an `mpsc` channel whenever the
//! data was (re)loaded.

use std::path::PathBuf;
use std::time::Duration;

use attendance_data::aggregator::AggregateOptions;
use attendance_data::analysis::AnalysisResult;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time;

use crate::data_manager::DataManager;

// ── Public types ──────────────────────────────────────────────────────────────

/// One loaded state of the workbook, forwarded to the report printer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub analysis: AnalysisResult,
    /// Load counter from the data manager; starts at 1.
    pub revision: u64,
    pub loaded_at: DateTime<Utc>,
    /// Last load error, if the workbook could not be read.
    pub error: Option<String>,
}

// ── WatchOrchestrator ─────────────────────────────────────────────────────────

/// Background workbook watcher.
///
/// Call [`WatchOrchestrator::start`] to spin up the loop in a dedicated tokio
/// task and receive a channel endpoint for [`Snapshot`] updates.
pub struct WatchOrchestrator {
    /// How often to check the workbook.
    check_interval: Duration,
    data_path: PathBuf,
    options: AggregateOptions,
}

impl WatchOrchestrator {
    pub fn new(check_interval_secs: u64, data_path: PathBuf, options: AggregateOptions) -> Self {
        Self {
            check_interval: Duration::from_secs(check_interval_secs.max(1)),
            data_path,
            options,
        }
    }

    /// Start the watch loop.
    ///
    /// Returns the receiving end for snapshots and a [`WatchHandle`] that can
    /// abort the loop. The first snapshot is sent immediately.
    pub fn start(self) -> (mpsc::Receiver<Snapshot>, WatchHandle) {
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(async move {
            self.watch_loop(tx).await;
        });

        (rx, WatchHandle { handle })
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Loads once, then checks on every tick. Exits when the receiver is
    /// dropped.
    async fn watch_loop(self, tx: mpsc::Sender<Snapshot>) {
        let mut data_manager = DataManager::new(self.data_path.clone(), self.options);

        let mut last_sent = 0;
        if !send_if_new(&mut data_manager, &tx, true, &mut last_sent).await {
            return;
        }

        let mut interval = time::interval(self.check_interval);
        // The first tick fires immediately; the initial load already ran.
        interval.tick().await;

        loop {
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!("watch channel closed; exiting loop");
                break;
            }

            if !send_if_new(&mut data_manager, &tx, false, &mut last_sent).await {
                break;
            }
        }
    }
}

/// Check the workbook and send a snapshot when the revision moved.
///
/// Returns `false` once the receiver has gone away.
async fn send_if_new(
    data_manager: &mut DataManager,
    tx: &mpsc::Sender<Snapshot>,
    force: bool,
    last_sent: &mut u64,
) -> bool {
    data_manager.get_data(force);
    let revision = data_manager.revision();
    if revision == *last_sent {
        return true;
    }
    let Some(analysis) = data_manager.cached().cloned() else {
        return true;
    };

    let snapshot = Snapshot {
        analysis,
        revision,
        loaded_at: Utc::now(),
        error: data_manager.last_error().map(str::to_string),
    };

    if let Err(e) = tx.send(snapshot).await {
        tracing::warn!(error = %e, "failed to send snapshot; receiver dropped");
        return false;
    }
    tracing::info!(revision, "workbook reloaded");
    *last_sent = revision;
    true
}

// ── WatchHandle ───────────────────────────────────────────────────────────────

/// A handle to the background watch task.
pub struct WatchHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Immediately abort the watch loop.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// `true` once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
