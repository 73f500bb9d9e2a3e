// src/engine/mod.rs

//! Build orchestration.
//!
//! - [`job`] holds the per-trigger job record and its state machine.
//! - [`orchestrator`] owns the active-job slot and sequences argument
//!   assembly, process execution and the artifact commit.

pub mod job;
pub mod orchestrator;

pub use job::{CompilationJob, JobHandle};
pub use orchestrator::Orchestrator;
pub use crate::types::JobState;
