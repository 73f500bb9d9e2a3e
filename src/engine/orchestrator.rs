// src/engine/orchestrator.rs

//! Top-level build orchestration.
//!
//! The orchestrator owns a single piece of shared mutable state: the active
//! job slot. Every `trigger` cancels whatever job is in the slot and puts its
//! own job there under the same lock, so the newest trigger always wins.
//! Cancellation is fire-and-forget; a superseded compiler may still be
//! exiting while the next one starts, which is why every job writes to its
//! own uniquely named temp artifact.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::artifact::ArtifactManager;
use crate::config::BuildConfig;
use crate::engine::job::{CompilationJob, JobHandle, new_job};
use crate::errors::{BuildError, BuildFailure, Result};
use crate::exec::args::build_arguments;
use crate::exec::runner::{Invocation, ProcessRunner};
use crate::types::JobState;

/// Concurrency-safe wrapper around one compiler configuration.
///
/// Cheap to clone; clones share the same active-job slot.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    config: BuildConfig,
    artifacts: ArtifactManager,
    runner: ProcessRunner,
    active: Mutex<Option<JobHandle>>,
    /// Serializes the final cancellation check with the rename.
    commit_lock: Mutex<()>,
    next_id: AtomicU64,
}

impl Orchestrator {
    pub fn new(config: BuildConfig) -> Self {
        let artifacts = ArtifactManager::new(
            config.out_dir.clone(),
            config.out_name.clone(),
            config.extension.clone(),
        );
        Self {
            shared: Arc::new(Shared {
                config,
                artifacts,
                runner: ProcessRunner,
                active: Mutex::new(None),
                commit_lock: Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.shared.config
    }

    pub fn artifacts(&self) -> &ArtifactManager {
        &self.shared.artifacts
    }

    /// Start a new build, superseding any running one.
    ///
    /// Without a completion callback this waits for the build and returns
    /// its result. With a callback it returns `Ok(())` as soon as the
    /// compiler has started (or the setup error if it could not be started)
    /// and the callback receives the terminal result exactly once.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn trigger(&self) -> Result<()> {
        // The guard exists before the args supplier runs, so a panicking
        // supplier still frees the slot.
        let mut run = JobRun::new(self.clone(), self.begin_job());

        let temp_path = self.shared.artifacts.temp_path(&run.job.temp_name);
        let invocation = self.invocation_for(&temp_path);
        debug!(job = run.job.id, command = ?invocation.command_line(), "compiler invocation");

        match self.shared.runner.spawn(&invocation, run.job.id) {
            Ok(process) => run.job.start(process),
            Err(err) => return run.finish(Err(err)),
        }

        match self.shared.config.callback.clone() {
            Some(callback) => {
                tokio::spawn(async move {
                    let result = run.execute().await;
                    callback(result);
                });
                Ok(())
            }
            None => run.execute().await,
        }
    }

    /// Request cancellation of the active job, if any. Always `Ok`.
    pub fn cancel(&self) -> Result<()> {
        let mut slot = self.lock_active();
        match slot.as_mut() {
            Some(active) => {
                if active.cancel() {
                    info!(job = active.id, "cancellation requested");
                } else {
                    debug!(job = active.id, "active job already cancelled or finishing");
                }
            }
            None => debug!("cancel requested with no active job"),
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Id of the job currently in the active slot.
    pub fn active_job(&self) -> Option<u64> {
        self.lock_active().as_ref().map(|a| a.id)
    }

    /// Wait until no job is active.
    pub async fn wait_idle(&self) {
        loop {
            let state = self.lock_active().as_ref().map(JobHandle::subscribe);
            let Some(mut state) = state else {
                return;
            };
            // Sender dropped means the job is gone; either way re-check the slot.
            let _ = state.wait_for(|s| s.is_terminal()).await;
            tokio::task::yield_now().await;
        }
    }

    pub fn unobserved_paths(&self) -> Vec<String> {
        self.shared.artifacts.unobserved_paths()
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.shared.artifacts.artifact_path()
    }

    /// The invocation a trigger would run right now, executable first.
    ///
    /// Uses the canonical temp name in place of a per-job one.
    pub fn command_line(&self) -> Vec<String> {
        let temp = self
            .shared
            .artifacts
            .temp_path(&self.shared.artifacts.canonical_temp_name());
        self.invocation_for(&temp).command_line()
    }

    fn invocation_for(&self, temp_path: &std::path::Path) -> Invocation {
        let cfg = &self.shared.config;
        let extra = cfg.current_args();
        Invocation {
            program: cfg.compiler.clone(),
            args: build_arguments(&extra, temp_path, &cfg.entry_point),
            env: cfg.env.clone(),
        }
    }

    /// Cancel the current job and install a new one, under one lock.
    fn begin_job(&self) -> CompilationJob {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let temp_name = self.shared.artifacts.temp_artifact_name();
        let (handle, job) = new_job(id, temp_name);

        let mut slot = self.lock_active();
        if let Some(previous) = slot.as_mut() {
            if previous.cancel() {
                info!(job = previous.id, by = id, "superseding active job");
            }
        }
        *slot = Some(handle);
        drop(slot);

        info!(job = id, temp = %job.temp_name, "build triggered");
        job
    }

    /// Clear the active slot if it still holds `id`.
    fn release(&self, id: u64) {
        let mut slot = self.lock_active();
        if slot.as_ref().is_some_and(|a| a.id == id) {
            *slot = None;
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<JobHandle>> {
        self.shared
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A job in flight, tied to its orchestrator.
///
/// Dropping it before `finish` (e.g. the caller dropped the `trigger`
/// future) discards the temp artifact, marks the job cancelled and frees the
/// active slot.
struct JobRun {
    orchestrator: Orchestrator,
    job: CompilationJob,
}

impl JobRun {
    fn new(orchestrator: Orchestrator, job: CompilationJob) -> Self {
        Self { orchestrator, job }
    }

    async fn execute(mut self) -> Result<()> {
        let deadline = self.orchestrator.shared.config.effective_timeout();

        let result = match self.job.take_process() {
            Some(process) => match process.wait(deadline, &mut self.job.signal).await {
                Ok(_output) => self.commit(),
                Err(err) => {
                    self.orchestrator.shared.artifacts.discard(&self.job.temp_name);
                    Err(err)
                }
            },
            None => Err(BuildError::Build {
                reason: BuildFailure::Cancelled,
                output: String::new(),
            }),
        };

        self.finish(result)
    }

    /// Rename the temp artifact into place unless the job was superseded
    /// after its process exited.
    fn commit(&mut self) -> Result<()> {
        let shared = &self.orchestrator.shared;
        let _guard = shared
            .commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.job.signal.is_cancelled() {
            debug!(job = self.job.id, "superseded before commit; discarding output");
            shared.artifacts.discard(&self.job.temp_name);
            return Err(BuildError::Build {
                reason: BuildFailure::Cancelled,
                output: String::new(),
            });
        }

        shared.artifacts.commit(&self.job.temp_name).map_err(|err| {
            shared.artifacts.discard(&self.job.temp_name);
            BuildError::from(err)
        })
    }

    fn finish(mut self, result: Result<()>) -> Result<()> {
        let job = &self.job;
        let elapsed_ms = job.elapsed_ms();

        let state = match &result {
            Ok(()) => {
                info!(
                    job = job.id,
                    elapsed_ms,
                    artifact = ?self.orchestrator.shared.artifacts.artifact_path(),
                    "build completed"
                );
                JobState::Completed
            }
            Err(err) if err.is_cancelled() => {
                info!(job = job.id, elapsed_ms, "build cancelled");
                JobState::Cancelled
            }
            Err(err) => {
                warn!(
                    job = job.id,
                    elapsed_ms,
                    stage = %err.stage(),
                    error = %err,
                    "build failed"
                );
                JobState::Failed
            }
        };

        // Free the slot before publishing so `wait_idle` never sees a
        // terminal job still sitting in it.
        self.orchestrator.release(self.job.id);
        self.job.transition(state);
        result
    }
}

impl Drop for JobRun {
    fn drop(&mut self) {
        if self.job.state().is_terminal() {
            return;
        }
        debug!(job = self.job.id, "job dropped before finishing");
        self.orchestrator.release(self.job.id);
        self.orchestrator.shared.artifacts.discard(&self.job.temp_name);
        self.job.transition(JobState::Cancelled);
    }
}
