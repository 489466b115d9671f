//! Scan sequencer: drives a session through a stage table on fixed timers.
//!
//! Each session runs as one tokio task. Step `i` of a stage is revealed at
//! `(i + 1) * step_interval` after the stage began, and the stage hands over
//! to the next one at `(steps + 1) * step_interval + transition_gap`. Leaving
//! the final stage makes the session terminal.
//!
//! Observers get two views of a session through its [`SequencerHandle`]:
//! the latest [`SequencerState`] snapshot (a `watch` channel) and the ordered
//! stream of [`ScanEvent`]s. Every mutation goes through a mutex that also
//! holds the cancellation flag, so once [`SequencerHandle::cancel`] returns
//! nothing further is published, whichever worker thread the task is on.

use crate::error::{Result, ScanError};
use crate::profile::{ScanProfile, TerminalAction};
use crate::stage::{Stage, StageTable};
use phishzil_core::{ScanKind, ScanningConfig, SessionId};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default delay between step reveals.
pub const STEP_INTERVAL: Duration = Duration::from_millis(800);

/// Default pause between a stage's last reveal slot and the next stage.
pub const TRANSITION_GAP: Duration = Duration::from_millis(500);

/// Timer settings shared by every session a sequencer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerTiming {
    /// Delay between step reveals
    pub step_interval: Duration,
    /// Extra pause before a stage transition
    pub transition_gap: Duration,
}

impl SequencerTiming {
    /// Build timings from the `[scanning]` config section.
    #[must_use]
    pub fn from_config(config: &ScanningConfig) -> Self {
        Self {
            step_interval: config.step_interval(),
            transition_gap: config.transition_gap(),
        }
    }

    /// Offset from stage start at which step `step_index` is revealed.
    #[must_use]
    pub fn reveal_offset(&self, step_index: usize) -> Duration {
        self.step_interval * u32::try_from(step_index + 1).unwrap_or(u32::MAX)
    }

    /// Offset from stage start at which a stage with `step_count` steps ends.
    #[must_use]
    pub fn stage_duration(&self, step_count: usize) -> Duration {
        self.reveal_offset(step_count) + self.transition_gap
    }
}

impl Default for SequencerTiming {
    fn default() -> Self {
        Self {
            step_interval: STEP_INTERVAL,
            transition_gap: TRANSITION_GAP,
        }
    }
}

/// Snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencerState {
    /// The opaque label being "scanned"
    pub subject_label: String,
    /// Index of the current stage; stays on the final stage once terminal
    pub current_stage_index: usize,
    /// Steps of the current stage revealed so far
    pub revealed_steps: Vec<String>,
    /// Progress target of the current stage
    pub progress: u8,
    /// Set once the final stage has completed
    pub terminal: bool,
}

impl SequencerState {
    fn initial(subject_label: String, first: &Stage) -> Self {
        Self {
            subject_label,
            current_stage_index: 0,
            revealed_steps: Vec::new(),
            progress: first.progress_target,
            terminal: false,
        }
    }

    /// The state machine position this snapshot corresponds to.
    #[must_use]
    pub fn phase(&self) -> SequencerPhase {
        if self.terminal {
            SequencerPhase::Terminal
        } else {
            SequencerPhase::Running {
                stage_index: self.current_stage_index,
                step_count: self.revealed_steps.len(),
            }
        }
    }
}

/// Position in the sequencer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerPhase {
    /// Inside `stage_index` with `step_count` steps revealed
    Running {
        /// Current stage
        stage_index: usize,
        /// Steps revealed in the current stage
        step_count: usize,
    },
    /// Past the final stage; absorbing
    Terminal,
}

/// What a session delivers to the caller once it finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// Session that produced this outcome
    pub session_id: SessionId,
    /// Subject label carried forward to the results view
    pub subject_label: String,
    /// Scan kind, when the session was started from a profile
    pub kind: Option<ScanKind>,
    /// What the presentation layer should do next
    pub action: TerminalAction,
}

/// Incremental notification emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// A stage became current. Emitted for stage 0 at start.
    StageEntered {
        /// Index of the new stage
        stage_index: usize,
        /// Stage title
        title: String,
        /// Stage subtitle
        subtitle: String,
        /// Stage progress target
        progress: u8,
    },
    /// One more step of the current stage was revealed.
    StepRevealed {
        /// Stage the step belongs to
        stage_index: usize,
        /// Position of the step in the stage
        step_index: usize,
        /// Step label
        label: String,
    },
    /// The final stage completed. Always the last event of a session.
    Completed(ScanOutcome),
}

impl ScanEvent {
    /// True for the terminal notification.
    /// Whether the final stage has been reached.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Starts scan sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSequencer {
    timing: SequencerTiming,
}

impl ScanSequencer {
    /// Create a sequencer with explicit timings.
    #[must_use]
    pub fn new(timing: SequencerTiming) -> Self {
        Self { timing }
    }

    /// Create a sequencer using the `[scanning]` config section.
    #[must_use]
    pub fn from_config(config: &ScanningConfig) -> Self {
        Self::new(SequencerTiming::from_config(config))
    }

    /// Validate `stages` and start a session for `subject_label`.
    ///
    /// Returns immediately; progress is delivered through the handle. A
    /// malformed table is rejected before anything is scheduled.
    pub fn start(
        &self,
        subject_label: impl Into<String>,
        stages: Vec<Stage>,
    ) -> Result<SequencerHandle> {
        let table = StageTable::new(stages)?;
        self.launch(subject_label.into(), table, None, TerminalAction::ReturnHome)
    }

    /// Start a session over an already validated, shared table.
    pub fn start_table(
        &self,
        subject_label: impl Into<String>,
        table: &StageTable,
    ) -> Result<SequencerHandle> {
        self.launch(
            subject_label.into(),
            table.clone(),
            None,
            TerminalAction::ReturnHome,
        )
    }

    /// Start a session configured by `profile`.
    ///
    /// A missing or blank `subject` falls back to the profile's placeholder.
    pub fn start_profile(
        &self,
        profile: &ScanProfile,
        subject: Option<&str>,
    ) -> Result<SequencerHandle> {
        self.launch(
            profile.resolve_subject(subject),
            profile.stages().clone(),
            Some(profile.kind()),
            profile.terminal_action(),
        )
    }

    fn launch(
        &self,
        subject_label: String,
        table: StageTable,
        kind: Option<ScanKind>,
        action: TerminalAction,
    ) -> Result<SequencerHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ScanError::NoRuntime(e.to_string()))?;

        let session_id = SessionId::generate();
        let first = &table[0];
        let state = SequencerState::initial(subject_label.clone(), first);

        let (state_tx, state_rx) = watch::channel(state.clone());
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let dispatcher = Arc::new(Dispatcher {
            session_id: session_id.clone(),
            shared: Mutex::new(Shared {
                state,
                cancelled: false,
                event_tx: Some(event_tx),
            }),
            state_tx,
        });

        tracing::info!(
            session_id = %session_id,
            subject = %subject_label,
            stages = table.len(),
            "Starting scan session"
        );

        dispatcher.publish(|_| {
            Some(ScanEvent::StageEntered {
                stage_index: 0,
                title: first.title.clone(),
                subtitle: first.subtitle.clone(),
                progress: first.progress_target,
            })
        });

        let outcome = ScanOutcome {
            session_id: session_id.clone(),
            subject_label,
            kind,
            action,
        };
        let started = Instant::now();
        runtime.spawn(run_session(
            Arc::clone(&dispatcher),
            table,
            self.timing,
            token.clone(),
            started,
            outcome,
        ));

        Ok(SequencerHandle {
            session_id,
            dispatcher,
            token,
            state_rx,
            events: event_rx,
        })
    }
}

/// Caller's side of a running session.
///
/// Dropping the handle cancels the session.
#[derive(Debug)]
pub struct SequencerHandle {
    session_id: SessionId,
    dispatcher: Arc<Dispatcher>,
    token: CancellationToken,
    state_rx: watch::Receiver<SequencerState>,
    events: mpsc::UnboundedReceiver<ScanEvent>,
}

impl SequencerHandle {
    /// Identifier carried in this session's log lines and outcome.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to snapshots. The current snapshot counts as already seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SequencerState> {
        self.state_rx.clone()
    }

    /// Next event, in emission order.
    ///
    /// Returns `None` after the terminal event or once the session is
    /// cancelled; events still queued at cancellation are discarded.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            event = self.events.recv() => event.filter(|_| !self.token.is_cancelled()),
        }
    }

    /// Drain events until the session ends and return its outcome.
    ///
    /// `None` when the session was cancelled first.
    pub async fn wait(mut self) -> Option<ScanOutcome> {
        while let Some(event) = self.next_event().await {
            if let ScanEvent::Completed(outcome) = event {
                return Some(outcome);
            }
        }
        None
    }

    /// Stop the session. Idempotent, and a no-op once the session is terminal.
    pub fn cancel(&self) {
        if self.dispatcher.cancel() {
            self.token.cancel();
        }
    }

    /// Whether [`cancel`](Self::cancel) stopped the session before it finished.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the final stage has been reached.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state_rx.borrow().terminal
    }
}

impl Drop for SequencerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
struct Shared {
    state: SequencerState,
    cancelled: bool,
    // Taken on completion or cancellation so the event stream ends.
    event_tx: Option<mpsc::UnboundedSender<ScanEvent>>,
}

#[derive(Debug)]
struct Dispatcher {
    session_id: SessionId,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<SequencerState>,
}

impl Dispatcher {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `mutate` and publish the result, unless the session is over.
    ///
    /// Returns false when nothing was published.
    fn publish<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut SequencerState) -> Option<ScanEvent>,
    {
        let mut shared = self.lock();
        if shared.cancelled || shared.state.terminal {
            return false;
        }

        let event = mutate(&mut shared.state);
        self.state_tx.send_replace(shared.state.clone());

        if let Some(event) = event {
            let terminal = event.is_terminal();
            if let Some(tx) = &shared.event_tx {
                // A caller that stopped reading events still gets snapshots.
                let _ = tx.send(event);
            }
            if terminal {
                shared.event_tx = None;
            }
        }
        true
    }

    /// Mark the session cancelled. False when it already finished.
    fn cancel(&self) -> bool {
        let mut shared = self.lock();
        if shared.state.terminal {
            return false;
        }
        if shared.cancelled {
            return true;
        }
        shared.cancelled = true;
        shared.event_tx = None;
        tracing::debug!(
            session_id = %self.session_id,
            stage = shared.state.current_stage_index,
            steps = shared.state.revealed_steps.len(),
            "Scan session cancelled"
        );
        true
    }
}

/// Sleep until `deadline`; false if cancelled first.
async fn sleep_until(deadline: Instant, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep_until(deadline) => true,
    }
}

async fn run_session(
    dispatcher: Arc<Dispatcher>,
    table: StageTable,
    timing: SequencerTiming,
    token: CancellationToken,
    started: Instant,
    outcome: ScanOutcome,
) {
    let session_id = outcome.session_id.clone();
    let mut stage_start = started;

    for (stage_index, stage) in table.iter().enumerate() {
        if stage_index > 0 {
            let entered = dispatcher.publish(|state| {
                state.current_stage_index = stage_index;
                state.revealed_steps.clear();
                state.progress = stage.progress_target;
                Some(ScanEvent::StageEntered {
                    stage_index,
                    title: stage.title.clone(),
                    subtitle: stage.subtitle.clone(),
                    progress: stage.progress_target,
                })
            });
            if !entered {
                return;
            }
            tracing::debug!(
                session_id = %session_id,
                stage = stage_index,
                progress = stage.progress_target,
                "Entered stage '{}'",
                stage.title
            );
        }

        for (step_index, label) in stage.steps.iter().enumerate() {
            if !sleep_until(stage_start + timing.reveal_offset(step_index), &token).await {
                return;
            }
            let revealed = dispatcher.publish(|state| {
                state.revealed_steps.push(label.clone());
                Some(ScanEvent::StepRevealed {
                    stage_index,
                    step_index,
                    label: label.clone(),
                })
            });
            if !revealed {
                return;
            }
            tracing::debug!(session_id = %session_id, stage = stage_index, step = step_index, "Revealed step '{}'", label);
        }

        let stage_end = stage_start + timing.stage_duration(stage.steps.len());
        if !sleep_until(stage_end, &token).await {
            return;
        }
        stage_start = stage_end;
    }

    let completed = dispatcher.publish(|state| {
        state.terminal = true;
        Some(ScanEvent::Completed(outcome))
    });
    if completed {
        tracing::info!(
            session_id = %session_id,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scan session complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage() -> Vec<Stage> {
        vec![
            Stage::new("first", "", 50).with_steps(["a", "b"]),
            Stage::new("second", "", 100).with_steps(["c"]).final_stage(),
        ]
    }

    #[test]
    fn test_timing_offsets() {
        let timing = SequencerTiming::default();
        assert_eq!(timing.reveal_offset(0), Duration::from_millis(800));
        assert_eq!(timing.reveal_offset(1), Duration::from_millis(1600));
        assert_eq!(timing.stage_duration(2), Duration::from_millis(2900));
        assert_eq!(timing.stage_duration(0), Duration::from_millis(1300));
    }

    #[test]
    fn test_timing_from_config() {
        let config = ScanningConfig {
            step_interval_ms: 10,
            transition_gap_ms: 5,
            results_delay_ms: 0,
        };
        let timing = SequencerTiming::from_config(&config);
        assert_eq!(timing.stage_duration(1), Duration::from_millis(25));
    }

    #[test]
    fn test_phase() {
        let mut state = SequencerState::initial("x".to_string(), &two_stage()[0]);
        assert_eq!(
            state.phase(),
            SequencerPhase::Running {
                stage_index: 0,
                step_count: 0
            }
        );
        state.terminal = true;
        assert_eq!(state.phase(), SequencerPhase::Terminal);
    }

    #[test]
    fn test_invalid_table_rejected_before_runtime_lookup() {
        // No runtime here: validation must fail first, so nothing is spawned.
        let err = ScanSequencer::default()
            .start("x", vec![])
            .expect_err("empty table");
        assert!(matches!(err, ScanError::InvalidStageTable(_)));

        let mut stages = two_stage();
        stages[0].is_final = true;
        let err = ScanSequencer::default()
            .start("x", stages)
            .expect_err("final flag on first stage");
        assert!(matches!(err, ScanError::InvalidStageTable(_)));
    }

    #[test]
    fn test_start_outside_runtime() {
        let err = ScanSequencer::default()
            .start("x", two_stage())
            .expect_err("no runtime");
        assert!(matches!(err, ScanError::NoRuntime(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_snapshot() {
        let mut handle = ScanSequencer::default()
            .start("https://example.com", two_stage())
            .expect("start");

        let state = handle.state();
        assert_eq!(state.subject_label, "https://example.com");
        assert_eq!(state.progress, 50);
        assert!(state.revealed_steps.is_empty());
        assert!(!handle.is_terminal());

        assert_eq!(
            handle.next_event().await,
            Some(ScanEvent::StageEntered {
                stage_index: 0,
                title: "first".to_string(),
                subtitle: String::new(),
                progress: 50,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let mut handle = ScanSequencer::default()
            .start("x", two_stage())
            .expect("start");
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_outcome_with_action() {
        let handle = ScanSequencer::default()
            .start_profile(&ScanProfile::email(), Some("invoice.eml"))
            .expect("start");
        let session_id = handle.session_id().clone();

        let outcome = handle.wait().await.expect("completed");
        assert_eq!(outcome.session_id, session_id);
        assert_eq!(outcome.subject_label, "invoice.eml");
        assert_eq!(outcome.kind, Some(ScanKind::Email));
        assert!(matches!(outcome.action, TerminalAction::ShowResults { .. }));
    }
}
