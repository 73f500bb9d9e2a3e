// src/errors.rs

//! Crate-wide error types.
//!
//! Every error a build can produce is a [`BuildError`], tagged with the
//! [`BuildStage`] it came from so callers can tell a compiler failure apart
//! from a failed commit.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::BuildStage;

/// Why a started compiler process did not produce a usable artifact.
#[derive(Debug)]
pub enum BuildFailure {
    /// Exited with a non-zero code (or was killed by a signal, `None`).
    Exit(Option<i32>),
    /// Deadline expired before the process exited.
    TimedOut(Duration),
    /// The job was superseded or explicitly cancelled.
    Cancelled,
    /// Waiting on the child failed at the OS level.
    Wait(std::io::Error),
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildFailure::Exit(Some(code)) => write!(f, "exit status {code}"),
            BuildFailure::Exit(None) => f.write_str("terminated by signal"),
            BuildFailure::TimedOut(d) => write!(f, "timed out after {}ms", d.as_millis()),
            BuildFailure::Cancelled => f.write_str("cancelled"),
            BuildFailure::Wait(e) => write!(f, "waiting for process: {e}"),
        }
    }
}

/// The temp artifact could not be renamed over the final artifact.
#[derive(Error, Debug)]
#[error("renaming {from:?} to {to:?}: {source}")]
pub struct RenameError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("config: {0}")]
    Config(String),

    #[error("setup: starting {program:?}: {source}")]
    Setup {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build: {reason}{}", format_output(.output))]
    Build { reason: BuildFailure, output: String },

    #[error("commit: {0}")]
    Commit(#[from] RenameError),

    #[error("config: IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn format_output(output: &str) -> String {
    let trimmed = output.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}

impl BuildError {
    pub fn stage(&self) -> BuildStage {
        match self {
            BuildError::Config(_) | BuildError::Io(_) | BuildError::Toml(_) => BuildStage::Config,
            BuildError::Setup { .. } => BuildStage::Setup,
            BuildError::Build { .. } => BuildStage::Build,
            BuildError::Commit(_) => BuildStage::Commit,
        }
    }

    /// True when the job ended because it was superseded or cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            BuildError::Build {
                reason: BuildFailure::Cancelled,
                ..
            }
        )
    }

    /// Compiler output captured for a failed build, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            BuildError::Build { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
