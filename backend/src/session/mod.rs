//! The single result slot and the run state machine.
//!
//! ```text
//! Idle ──▶ Parsing ──▶ Validating ──▶ Transforming ──▶ Succeeded
//!             │             │
//!             └─────────────┴──────────────────────────▶ Failed
//! ```
//!
//! Each upload dispatches a run with a fresh, strictly increasing [`RunId`].
//! Only the latest dispatched run may write to the slot: when an older run
//! finishes after a newer one started, its outcome is dropped. Nothing is
//! cancelled; the stale run simply completes unobserved.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::api::logs::{log_run, LogEntry};
use crate::error::ProcessingError;
use crate::models::ProcessingResult;
use crate::parser::decode_upload;
use crate::transform::pipeline::{process_with_progress, ProcessOptions, Progress, Stage};

/// Identifier of one run. Zero means "no run dispatched yet".
pub type RunId = u64;

/// State of the latest run.
#[derive(Debug, Clone)]
pub enum RunState {
    Idle,
    Parsing { file_name: String },
    Validating { file_name: String },
    Transforming { file_name: String },
    Succeeded(Arc<ProcessingResult>),
    Failed { file_name: String, error: ProcessingError },
}

impl RunState {
    fn in_stage(stage: Stage, file_name: &str) -> Self {
        let file_name = file_name.to_string();
        match stage {
            Stage::Parsing => RunState::Parsing { file_name },
            Stage::Validating => RunState::Validating { file_name },
            Stage::Transforming => RunState::Transforming { file_name },
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self {
            RunState::Idle => RunPhase::Idle,
            RunState::Parsing { .. } => RunPhase::Parsing,
            RunState::Validating { .. } => RunPhase::Validating,
            RunState::Transforming { .. } => RunPhase::Transforming,
            RunState::Succeeded(_) => RunPhase::Succeeded,
            RunState::Failed { .. } => RunPhase::Failed,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            RunState::Idle => None,
            RunState::Parsing { file_name }
            | RunState::Validating { file_name }
            | RunState::Transforming { file_name }
            | RunState::Failed { file_name, .. } => Some(file_name),
            RunState::Succeeded(result) => Some(&result.file_name),
        }
    }

    /// Succeeded or Failed.
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Succeeded(_) | RunState::Failed { .. })
    }

    pub fn result(&self) -> Option<&Arc<ProcessingResult>> {
        match self {
            RunState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ProcessingError> {
        match self {
            RunState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Payload-free view of [`RunState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Parsing,
    Validating,
    Transforming,
    Succeeded,
    Failed,
}

/// What the slot currently shows.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub state: RunState,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
}

impl RunSnapshot {
    fn new(run_id: RunId, state: RunState) -> Self {
        Self {
            run_id,
            state,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// How one run ended, whether or not the slot still showed it.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub state: RunState,
    /// False when a newer run had started, so this outcome was dropped.
    pub published: bool,
}

/// Single-slot holder of the latest run.
pub struct RunSlot {
    last_dispatched: AtomicU64,
    sender: watch::Sender<RunSnapshot>,
}

impl RunSlot {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(RunSnapshot::new(0, RunState::Idle));
        Self {
            last_dispatched: AtomicU64::new(0),
            sender,
        }
    }

    /// Dispatch a new run. The slot resets to `Idle` under the new id.
    pub fn begin(&self) -> RunId {
        let run_id = self.last_dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        self.sender.send_if_modified(|snap| {
            if run_id > snap.run_id {
                *snap = RunSnapshot::new(run_id, RunState::Idle);
                true
            } else {
                false
            }
        });
        run_id
    }

    /// Write `state` for `run_id`. Returns false, leaving the slot alone,
    /// when `run_id` is not the latest dispatched run. A newer run counts as
    /// dispatched as soon as its id is taken, before `begin` resets the slot.
    pub fn publish(&self, run_id: RunId, state: RunState) -> bool {
        self.sender.send_if_modified(|snap| {
            if snap.run_id == run_id && run_id == self.last_dispatched.load(Ordering::SeqCst) {
                *snap = RunSnapshot::new(run_id, state);
                true
            } else {
                false
            }
        })
    }

    pub fn current(&self) -> RunSnapshot {
        self.sender.borrow().clone()
    }

    /// Id of the most recently dispatched run.
    pub fn latest_run(&self) -> RunId {
        self.last_dispatched.load(Ordering::SeqCst)
    }

    /// Result of the latest run, if it succeeded.
    pub fn latest_result(&self) -> Option<Arc<ProcessingResult>> {
        self.sender.borrow().state.result().cloned()
    }

    /// Receiver notified on every slot change.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.sender.subscribe()
    }

    /// Dispatch and drive one run for an uploaded file.
    pub async fn run(&self, file_name: &str, bytes: &[u8], options: &ProcessOptions) -> RunOutcome {
        let run_id = self.begin();
        let mut tracker = SlotProgress {
            slot: self,
            run_id,
            file_name,
        };

        let text = decode_upload(bytes);
        let outcome = process_with_progress(file_name, &text, options, &mut tracker).await;

        let state = match outcome {
            Ok(result) => RunState::Succeeded(Arc::new(result)),
            Err(error) => RunState::Failed {
                file_name: file_name.to_string(),
                error,
            },
        };

        let published = self.publish(run_id, state.clone());
        if !published {
            tracker.log(LogEntry::warning(format!(
                "Superseded by run {}, result dropped",
                self.latest_run()
            )));
        }

        RunOutcome {
            run_id,
            state,
            published,
        }
    }
}

impl Default for RunSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress observer that moves the slot through the stages of one run.
struct SlotProgress<'a> {
    slot: &'a RunSlot,
    run_id: RunId,
    file_name: &'a str,
}

impl Progress for SlotProgress<'_> {
    fn stage(&mut self, stage: Stage) {
        self.slot
            .publish(self.run_id, RunState::in_stage(stage, self.file_name));
    }

    fn log(&mut self, entry: LogEntry) {
        log_run(self.run_id, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const VALID: &[u8] = b"Issue key,Custom field (Parent Key)\nA-1,A-0\nA-2,A-2";

    #[test]
    fn test_starts_idle() {
        let slot = RunSlot::new();
        let snap = slot.current();
        assert_eq!(snap.run_id, 0);
        assert_eq!(snap.state.phase(), RunPhase::Idle);
        assert!(slot.latest_result().is_none());
    }

    #[test]
    fn test_run_ids_increase() {
        let slot = RunSlot::new();
        assert_eq!(slot.begin(), 1);
        assert_eq!(slot.begin(), 2);
        assert_eq!(slot.latest_run(), 2);
        assert_eq!(slot.current().run_id, 2);
    }

    #[test]
    fn test_stale_publish_is_dropped() {
        let slot = RunSlot::new();
        let old = slot.begin();
        let new = slot.begin();

        let stale = RunState::Failed {
            file_name: "old.csv".into(),
            error: ProcessingError::unknown("late"),
        };
        assert!(!slot.publish(old, stale));
        assert_eq!(slot.current().state.phase(), RunPhase::Idle);

        assert!(slot.publish(new, RunState::Parsing { file_name: "new.csv".into() }));
        assert_eq!(slot.current().state.file_name(), Some("new.csv"));
    }

    #[tokio::test]
    async fn test_successful_run() {
        let slot = RunSlot::new();
        let outcome = slot.run("sprint.csv", VALID, &ProcessOptions::immediate()).await;

        assert!(outcome.published);
        assert_eq!(outcome.run_id, 1);
        let result = slot.latest_result().unwrap();
        assert_eq!(result.file_name, "sprint.csv");
        assert_eq!(result.flagged_count(), 1);
        assert_eq!(slot.current().state.phase(), RunPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_failed_run_clears_previous_result() {
        let slot = RunSlot::new();
        slot.run("good.csv", VALID, &ProcessOptions::immediate()).await;
        let outcome = slot
            .run("bad.csv", b"Summary\nx", &ProcessOptions::immediate())
            .await;

        assert!(outcome.published);
        assert_eq!(outcome.state.phase(), RunPhase::Failed);
        assert!(slot.latest_result().is_none());
        let snap = slot.current();
        assert_eq!(snap.state.error().map(|e| e.kind()), Some("validation"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_upload_still_succeeds() {
        let slot = RunSlot::new();
        let bytes = b"Issue key,Summary,Custom field (Parent Key)\nA-1,Caf\xE9,A-0";
        let outcome = slot
            .run("latin1.csv", bytes, &ProcessOptions::immediate())
            .await;

        assert!(outcome.published);
        let result = slot.latest_result().unwrap();
        assert_eq!(result.rows[0].row().value("Summary"), "Caf\u{fffd}");
        assert_eq!(result.flagged_count(), 1);
    }

    #[test]
    fn test_publish_between_dispatch_and_reset_is_dropped() {
        let slot = RunSlot::new();
        let old = slot.begin();

        // A newer run has taken its id but not yet reset the slot.
        slot.last_dispatched.fetch_add(1, Ordering::SeqCst);
        assert_eq!(slot.current().run_id, old);

        let late = RunState::Parsing { file_name: "old.csv".into() };
        assert!(!slot.publish(old, late));
        assert_eq!(slot.current().state.phase(), RunPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_dispatched_run_wins() {
        let slot = Arc::new(RunSlot::new());

        let slow = {
            let slot = slot.clone();
            tokio::spawn(async move {
                let options = ProcessOptions::immediate().with_delay(Duration::from_secs(5));
                slot.run("first.csv", VALID, &options).await
            })
        };
        // Let the first run reach its delay before re-uploading.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let fast = slot
            .run("second.csv", VALID, &ProcessOptions::immediate())
            .await;
        let slow = slow.await.unwrap();

        assert!(fast.published);
        assert!(!slow.published);
        assert!(slow.state.is_finished());
        assert!(slow.run_id < fast.run_id);
        assert_eq!(slot.latest_result().unwrap().file_name, "second.csv");
    }

    #[tokio::test]
    async fn test_subscribers_see_final_state() {
        let slot = RunSlot::new();
        let mut rx = slot.subscribe();
        slot.run("watched.csv", VALID, &ProcessOptions::immediate()).await;

        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.phase(), RunPhase::Succeeded);
    }
}
