// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`args`] assembles the compiler command line.
//! - [`runner`] starts the compiler with `tokio::process::Command`, captures
//!   its output and enforces the per-job deadline.
//! - [`cancel`] is the one-shot signal used to stop a running job.

pub mod args;
pub mod cancel;
pub mod runner;

pub use args::build_arguments;
pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use runner::{Invocation, ProcessRunner, RunningProcess};
