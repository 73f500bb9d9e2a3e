// src/exec/runner.rs

//! Runs a single compiler process.
//!
//! Starting the process ([`ProcessRunner::spawn`]) and waiting for it
//! ([`RunningProcess::wait`]) are separate so that a setup failure can be
//! reported to the caller before a job detaches.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{BuildError, BuildFailure, Result};
use crate::exec::cancel::CancelSignal;

/// How long to keep draining output after the process is gone. A killed
/// compiler can leave grandchildren holding the pipes open.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Applied on top of the inherited environment; later entries win.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Program followed by its arguments, for display.
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Start the process with piped, captured output.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(&self, invocation: &Invocation, job: u64) -> Result<RunningProcess> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| BuildError::Setup {
            program: invocation.program.clone(),
            source,
        })?;

        info!(
            job,
            pid = child.id(),
            program = %invocation.program,
            "compiler process started"
        );

        let output = Arc::new(Mutex::new(String::new()));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_capture(stdout, "stdout", job, Arc::clone(&output)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_capture(stderr, "stderr", job, Arc::clone(&output)));
        }

        Ok(RunningProcess {
            child,
            output,
            readers,
            job,
        })
    }
}

/// Handle to a started compiler process.
#[derive(Debug)]
pub struct RunningProcess {
    child: Child,
    output: Arc<Mutex<String>>,
    readers: Vec<JoinHandle<()>>,
    job: u64,
}

impl RunningProcess {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for exit, deadline expiry, or cancellation.
    ///
    /// On success returns the captured output. On any failure the process is
    /// killed if still running and the captured output travels with the
    /// error.
    pub async fn wait(mut self, deadline: Duration, cancel: &mut CancelSignal) -> Result<String> {
        let outcome = tokio::select! {
            status = self.child.wait() => match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(BuildFailure::Exit(status.code())),
                Err(e) => Err(BuildFailure::Wait(e)),
            },
            _ = tokio::time::sleep(deadline) => {
                info!(
                    job = self.job,
                    deadline_ms = deadline.as_millis() as u64,
                    "compiler deadline expired; killing process"
                );
                if let Err(e) = self.child.kill().await {
                    warn!(job = self.job, error = %e, "failed to kill compiler after deadline");
                }
                Err(BuildFailure::TimedOut(deadline))
            }
            _ = cancel.cancelled() => {
                info!(job = self.job, "cancellation requested; killing compiler process");
                if let Err(e) = self.child.kill().await {
                    warn!(job = self.job, error = %e, "failed to kill compiler on cancellation");
                }
                Err(BuildFailure::Cancelled)
            }
        };

        let output = self.collect_output().await;

        match outcome {
            Ok(()) => Ok(output),
            Err(reason) => {
                debug!(job = self.job, %reason, "compiler process did not succeed");
                Err(BuildError::Build { reason, output })
            }
        }
    }

    async fn collect_output(&mut self) -> String {
        let until = tokio::time::Instant::now() + OUTPUT_DRAIN_GRACE;
        for reader in self.readers.iter_mut() {
            if tokio::time::timeout_at(until, &mut *reader).await.is_err() {
                debug!(job = self.job, "output pipe still open after exit; abandoning reader");
                reader.abort();
            }
        }

        let guard = self.output.lock().unwrap_or_else(|p| p.into_inner());
        guard.clone()
    }
}

/// Drain one output pipe into the shared buffer, logging each line.
fn spawn_capture<R>(
    pipe: R,
    stream: &'static str,
    job: u64,
    sink: Arc<Mutex<String>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    debug!(job, stream, "{}", line.trim_end());
                    let mut out = sink.lock().unwrap_or_else(|p| p.into_inner());
                    out.push_str(&line);
                    if !line.ends_with('\n') {
                        out.push('\n');
                    }
                }
                Err(e) => {
                    debug!(job, stream, error = %e, "stopped reading compiler output");
                    break;
                }
            }
        }
    })
}
