// src/config/mod.rs

//! Configuration for hotbuild.
//!
//! - [`model`] holds the runtime [`BuildConfig`] the orchestrator consumes
//!   and the TOML-backed file model.
//! - [`loader`] reads a config file from disk.
//! - [`validate`] turns the raw file model into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path};
pub use model::{
    ArgsSupplier, BuildConfig, BuildSection, CompletionCallback, ConfigFile, DEFAULT_TIMEOUT,
    RawConfigFile,
};
pub use validate::{parse_duration, parse_timeout};
