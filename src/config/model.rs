// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::BuildError;
use crate::types::OutputExtension;

/// Deadline applied to a job when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Produces pass-through compiler arguments. Re-invoked on every trigger, so
/// values such as a version stamp can change between builds.
pub type ArgsSupplier = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Receives the terminal result of an asynchronously run job.
pub type CompletionCallback = Arc<dyn Fn(Result<(), BuildError>) + Send + Sync>;

/// Runtime configuration consumed by the orchestrator.
///
/// Immutable for the lifetime of one `Orchestrator`. Nothing is validated up
/// front; a bad compiler or output directory shows up as a setup or commit
/// error on the first trigger.
#[derive(Clone)]
pub struct BuildConfig {
    /// Program invoked as the compiler, e.g. `go` or `tinygo`.
    pub compiler: String,
    /// Source entry point handed to the compiler, e.g. `cmd/app/main.go`.
    pub entry_point: PathBuf,
    /// Artifact name without extension, e.g. `app`.
    pub out_name: String,
    /// Artifact suffix, e.g. `.exe`, `.wasm`, or empty.
    pub extension: String,
    /// Directory the artifact and temp artifacts are written to.
    pub out_dir: PathBuf,
    pub extra_args: Option<ArgsSupplier>,
    /// When set, `trigger` detaches and this is the only result channel.
    pub callback: Option<CompletionCallback>,
    pub timeout: Option<Duration>,
    /// Overlays on top of the inherited environment, e.g. `GOOS=js`.
    pub env: Vec<(String, String)>,
}

impl BuildConfig {
    pub fn new(
        compiler: impl Into<String>,
        entry_point: impl Into<PathBuf>,
        out_name: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            compiler: compiler.into(),
            entry_point: entry_point.into(),
            out_name: out_name.into(),
            extension: String::new(),
            out_dir: out_dir.into(),
            extra_args: None,
            callback: None,
            timeout: None,
            env: Vec::new(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_extra_args<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.extra_args = Some(Arc::new(supplier));
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Result<(), BuildError>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Configured timeout, or [`DEFAULT_TIMEOUT`] when unset or zero.
    pub fn effective_timeout(&self) -> Duration {
        match self.timeout {
            Some(t) if !t.is_zero() => t,
            _ => DEFAULT_TIMEOUT,
        }
    }

    /// Current pass-through arguments (empty without a supplier).
    pub fn current_args(&self) -> Vec<String> {
        self.extra_args.as_ref().map(|f| f()).unwrap_or_default()
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("compiler", &self.compiler)
            .field("entry_point", &self.entry_point)
            .field("out_name", &self.out_name)
            .field("extension", &self.extension)
            .field("out_dir", &self.out_dir)
            .field("extra_args", &self.extra_args.is_some())
            .field("callback", &self.callback.is_some())
            .field("timeout", &self.timeout)
            .field("env", &self.env)
            .finish()
    }
}

/// Configuration file as read from TOML, before validation.
///
/// ```toml
/// [build]
/// compiler = "go"
/// entry = "cmd/app/main.go"
/// out_name = "app"
/// extension = "auto"
/// out_dir = "bin"
/// args = ["-trimpath", "-X", "main.version=1.0"]
/// timeout = "30s"
///
/// [env]
/// CGO_ENABLED = "0"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub build: BuildSection,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    pub compiler: String,

    pub entry: PathBuf,

    pub out_name: String,

    /// `""` (default), `"auto"`, or a literal suffix such as `".wasm"`.
    #[serde(default)]
    pub extension: String,

    pub out_dir: PathBuf,

    /// Static pass-through arguments, `-X` tokens included.
    #[serde(default)]
    pub args: Vec<String>,

    /// Duration string such as `"500ms"` or `"30s"`.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// Validated configuration file.
///
/// Built from [`RawConfigFile`] via `TryFrom`; see `validate.rs`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub compiler: String,
    pub entry: PathBuf,
    pub out_name: String,
    pub extension: OutputExtension,
    pub out_dir: PathBuf,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    pub env: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Resolve relative `entry` and `out_dir` against `root`.
    pub fn rooted_at(mut self, root: &std::path::Path) -> Self {
        if self.entry.is_relative() {
            self.entry = root.join(&self.entry);
        }
        if self.out_dir.is_relative() {
            self.out_dir = root.join(&self.out_dir);
        }
        self
    }

    /// Convert into the runtime configuration (sync mode, no callback).
    pub fn into_build_config(self) -> BuildConfig {
        let mut cfg = BuildConfig::new(self.compiler, self.entry, self.out_name, self.out_dir)
            .with_extension(self.extension.resolve());

        if !self.args.is_empty() {
            let args = self.args;
            cfg = cfg.with_extra_args(move || args.clone());
        }
        cfg.timeout = self.timeout;
        cfg.env = self.env.into_iter().collect();
        cfg
    }
}
