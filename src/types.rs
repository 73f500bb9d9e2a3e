use std::fmt;
use std::str::FromStr;

/// Lifecycle of a single compilation job.
///
/// `Created -> Running -> {Completed | Failed | Cancelled}`. The three
/// terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Phase of a build in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Loading or validating configuration.
    Config,
    /// Starting the compiler process.
    Setup,
    /// Running the compiler process.
    Build,
    /// Renaming the temp artifact into place.
    Commit,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStage::Config => "config",
            BuildStage::Setup => "setup",
            BuildStage::Build => "build",
            BuildStage::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// Output extension as written in a config file.
///
/// `"auto"` resolves to the platform executable suffix (`.exe` on Windows,
/// empty elsewhere); anything else is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputExtension {
    #[default]
    None,
    Auto,
    Literal(String),
}

impl OutputExtension {
    pub fn resolve(&self) -> String {
        match self {
            OutputExtension::None => String::new(),
            OutputExtension::Auto => std::env::consts::EXE_SUFFIX.to_string(),
            OutputExtension::Literal(s) => s.clone(),
        }
    }
}

impl FromStr for OutputExtension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(OutputExtension::None);
        }
        if s.eq_ignore_ascii_case("auto") {
            return Ok(OutputExtension::Auto);
        }
        if s.contains('/') || s.contains('\\') {
            return Err(format!(
                "invalid extension {s:?}: must not contain path separators"
            ));
        }
        Ok(OutputExtension::Literal(s.to_string()))
    }
}
