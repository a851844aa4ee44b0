//! Runs submissions inline or on a worker thread and applies their outcomes.
//!
//! Workers report back over an mpsc channel that the owning controller drains
//! with [`SubmissionDriver::poll`] or [`SubmissionDriver::wait_for_completion`].
//! Every attempt produces exactly one outcome, including when the work
//! panics, so `Loading` is always left.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use calorie_counter_core::{
    Completion, SubmissionError, SubmissionMachine, SubmissionState, SubmissionStatus, Ticket,
    normalize_panic, panic_description, redact_sensitive,
};

use crate::AppError;

/// Outcome reported by a worker thread.
struct WorkerCompletion<T> {
    ticket: Ticket,
    submission_id: String,
    outcome: Result<T, SubmissionError>,
}

/// Submission machine plus the channel its workers report on.
pub struct SubmissionDriver<T> {
    stage: &'static str,
    machine: SubmissionMachine<T>,
    completion_tx: Sender<WorkerCompletion<T>>,
    completion_rx: Receiver<WorkerCompletion<T>>,
}

impl<T> SubmissionDriver<T> {
    /// Creates an idle driver; `stage` tags its log events.
    pub fn new(stage: &'static str) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            stage,
            machine: SubmissionMachine::new(),
            completion_tx,
            completion_rx,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> &SubmissionState<T> {
        self.machine.state()
    }

    /// Current lifecycle tag.
    pub fn status(&self) -> SubmissionStatus {
        self.machine.status()
    }

    /// Returns `true` while an attempt is in flight.
    pub fn is_loading(&self) -> bool {
        self.machine.state().is_loading()
    }

    /// Number of attempts started.
    pub fn attempts(&self) -> u64 {
        self.machine.attempts()
    }

    /// Clears a terminal state back to `Idle`.
    pub fn reset_terminal(&mut self) -> bool {
        self.machine.reset_terminal()
    }

    /// Takes the result out of a `Success` state.
    pub fn take_result(&mut self) -> Option<T> {
        self.machine.take_result()
    }

    /// Runs `work` on the calling thread.
    ///
    /// Returns `false` without running `work` while an attempt is already in
    /// flight or after teardown.
    pub fn run_blocking<F>(&mut self, fallback: &str, work: F) -> bool
    where
        F: FnOnce() -> Result<T, SubmissionError>,
    {
        let Some(ticket) = self.begin() else {
            return false;
        };
        let submission_id = new_submission_id();
        tracing::info!(
            stage = self.stage,
            action = "submit",
            submission_id = %submission_id,
            attempt = ticket.attempt()
        );

        let outcome = run_guarded(self.stage, work, fallback);
        self.apply(&ticket, &submission_id, outcome);
        true
    }

    /// Applies every completion the workers have reported so far.
    ///
    /// Returns `true` when the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.completion_rx.try_recv() {
                Ok(completion) => changed |= self.apply_worker(completion),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return changed,
            }
        }
    }

    /// Blocks until the in-flight attempt completes or `timeout` elapses.
    ///
    /// Returns `true` when no attempt is in flight afterwards.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.is_loading() && !self.machine.is_torn_down() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completion_rx.recv_timeout(remaining) {
                Ok(completion) => {
                    self.apply_worker(completion);
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        !self.is_loading()
    }

    /// Revokes the liveness token; later completions are dropped.
    pub fn teardown(&mut self) {
        if !self.machine.is_torn_down() {
            tracing::debug!(stage = self.stage, action = "teardown");
        }
        self.machine.teardown();
    }

    fn begin(&mut self) -> Option<Ticket> {
        let ticket = self.machine.begin();
        if ticket.is_none() {
            tracing::debug!(
                stage = self.stage,
                action = "submit_ignored",
                loading = self.is_loading(),
                torn_down = self.machine.is_torn_down()
            );
        }
        ticket
    }

    fn apply_worker(&mut self, completion: WorkerCompletion<T>) -> bool {
        let WorkerCompletion {
            ticket,
            submission_id,
            outcome,
        } = completion;
        self.apply(&ticket, &submission_id, outcome)
    }

    fn apply(
        &mut self,
        ticket: &Ticket,
        submission_id: &str,
        outcome: Result<T, SubmissionError>,
    ) -> bool {
        let failure = outcome
            .as_ref()
            .err()
            .map(|error| (error.kind(), error.status()));
        let completion = self.machine.complete(ticket, outcome);

        match (completion, failure) {
            (Completion::Applied, None) => {
                tracing::info!(
                    stage = self.stage,
                    action = "complete",
                    submission_id,
                    status = ?self.status()
                );
            }
            (Completion::Applied, Some((kind, http_status))) => {
                tracing::warn!(
                    stage = self.stage,
                    action = "complete",
                    submission_id,
                    status = ?self.status(),
                    error_kind = ?kind,
                    http_status = ?http_status
                );
            }
            (ignored, _) => {
                tracing::debug!(
                    stage = self.stage,
                    action = "completion_ignored",
                    submission_id,
                    reason = ?ignored
                );
            }
        }

        completion == Completion::Applied
    }
}

impl<T: Send + 'static> SubmissionDriver<T> {
    /// Runs `work` on a named worker thread.
    ///
    /// Returns `Ok(false)` while an attempt is already in flight or after
    /// teardown. The outcome is applied by a later [`SubmissionDriver::poll`]
    /// or [`SubmissionDriver::wait_for_completion`].
    ///
    /// # Errors
    /// Returns [`AppError::Worker`] when the thread cannot be spawned; the
    /// attempt is then completed as a transport failure so the state does not
    /// stay `Loading`.
    pub fn spawn<F>(&mut self, fallback: &'static str, work: F) -> Result<bool, AppError>
    where
        F: FnOnce() -> Result<T, SubmissionError> + Send + 'static,
    {
        let Some(ticket) = self.begin() else {
            return Ok(false);
        };
        let submission_id = new_submission_id();
        tracing::info!(
            stage = self.stage,
            action = "dispatch",
            submission_id = %submission_id,
            attempt = ticket.attempt()
        );

        let worker_ticket = ticket.clone();
        let worker_id = submission_id.clone();
        let completion_tx = self.completion_tx.clone();
        let stage = self.stage;
        let spawned = std::thread::Builder::new()
            .name(format!("calorie-counter-{stage}"))
            .spawn(move || {
                let outcome = run_guarded(stage, work, fallback);
                if !worker_ticket.is_live() {
                    tracing::debug!(
                        stage,
                        action = "late_completion_dropped",
                        submission_id = %worker_id
                    );
                    return;
                }
                let _ = completion_tx.send(WorkerCompletion {
                    ticket: worker_ticket,
                    submission_id: worker_id,
                    outcome,
                });
            });

        if let Err(error) = spawned {
            let message = format!("failed to start {stage} worker: {error}");
            self.apply(
                &ticket,
                &submission_id,
                Err(SubmissionError::transport(None, fallback)),
            );
            return Err(AppError::Worker(message));
        }
        Ok(true)
    }
}

impl<T> std::fmt::Debug for SubmissionDriver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionDriver")
            .field("stage", &self.stage)
            .field("status", &self.status())
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

fn run_guarded<T, F>(stage: &str, work: F, fallback: &str) -> Result<T, SubmissionError>
where
    F: FnOnce() -> Result<T, SubmissionError>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let description = panic_description(payload.as_ref())
                .map(|text| redact_sensitive(&text))
                .unwrap_or_default();
            tracing::error!(stage, action = "worker_panic", panic = %description);
            Err(normalize_panic(payload.as_ref(), fallback))
        }
    }
}

fn new_submission_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}
