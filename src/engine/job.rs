// src/engine/job.rs

//! Per-trigger job state.
//!
//! Each trigger produces two halves:
//! - [`JobHandle`] sits in the orchestrator's active slot and is what
//!   `cancel` and supersession act on;
//! - [`CompilationJob`] is owned by the unit of work running the build.

use std::time::Instant;

use tokio::sync::watch;
use tracing::debug;

use crate::exec::cancel::{CancelHandle, CancelSignal, cancel_pair};
use crate::exec::runner::RunningProcess;
use crate::types::JobState;

/// Orchestrator-side record of the active job.
#[derive(Debug)]
pub struct JobHandle {
    pub id: u64,
    cancel: CancelHandle,
    state: watch::Receiver<JobState>,
}

impl JobHandle {
    /// Ask the job to stop. Does not wait for it.
    pub fn cancel(&mut self) -> bool {
        self.cancel.cancel()
    }

    /// Completion signal: follows the job through its states.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }
}

/// Job-side state for one build attempt.
#[derive(Debug)]
pub struct CompilationJob {
    pub id: u64,
    pub temp_name: String,
    pub started_at: Instant,
    pub signal: CancelSignal,
    process: Option<RunningProcess>,
    state: watch::Sender<JobState>,
}

/// Create both halves of a new job in the `Created` state.
pub fn new_job(id: u64, temp_name: String) -> (JobHandle, CompilationJob) {
    let (cancel, signal) = cancel_pair();
    let (state_tx, state_rx) = watch::channel(JobState::Created);

    let handle = JobHandle {
        id,
        cancel,
        state: state_rx,
    };
    let job = CompilationJob {
        id,
        temp_name,
        started_at: Instant::now(),
        signal,
        process: None,
        state: state_tx,
    };
    (handle, job)
}

impl CompilationJob {
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Record the started process and move to `Running`.
    pub fn start(&mut self, process: RunningProcess) {
        debug!(job = self.id, pid = process.pid(), "job running");
        self.process = Some(process);
        self.transition(JobState::Running);
    }

    pub fn take_process(&mut self) -> Option<RunningProcess> {
        self.process.take()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Move to `next`. Terminal states are final; later transitions are
    /// ignored.
    pub fn transition(&mut self, next: JobState) {
        let current = self.state();
        if current.is_terminal() {
            debug!(job = self.id, %current, %next, "ignoring transition out of terminal state");
            return;
        }
        self.state.send_replace(next);
    }
}
