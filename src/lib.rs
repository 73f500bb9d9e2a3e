// src/lib.rs

pub mod artifact;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate, parse_timeout};

pub use crate::artifact::ArtifactManager;
pub use crate::config::BuildConfig;
pub use crate::engine::Orchestrator;
pub use crate::errors::{BuildError, BuildFailure, RenameError};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, runs one synchronous build and reports the artifact.
/// Ctrl-C while the compiler is running cancels the build.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;

    if let Some(ref t) = args.timeout {
        apply_timeout_override(&mut cfg, t)?;
    }

    let orchestrator = Orchestrator::new(cfg.into_build_config());

    if args.dry_run {
        print_dry_run(&orchestrator);
        return Ok(());
    }

    let ctrl_c = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling build");
            let _ = orchestrator.cancel();
        })
    };

    let result = orchestrator.trigger().await;
    ctrl_c.abort();
    result?;

    let artifact = orchestrator.artifact_path();
    let digest = orchestrator
        .artifacts()
        .artifact_digest()?
        .ok_or_else(|| anyhow!("artifact {:?} missing after successful build", artifact))?;

    println!("{}", artifact.display());
    println!("blake3 {digest}");
    Ok(())
}

/// Apply `--timeout`, with the same checks as `[build].timeout`.
fn apply_timeout_override(cfg: &mut ConfigFile, raw: &str) -> Result<()> {
    let timeout = parse_timeout(raw).map_err(|e| anyhow!("--timeout: {e}"))?;
    cfg.timeout = Some(timeout);
    Ok(())
}

fn print_dry_run(orchestrator: &Orchestrator) {
    let cfg = orchestrator.config();
    println!("hotbuild dry-run");
    println!("  command: {}", orchestrator.command_line().join(" "));
    println!("  artifact: {}", orchestrator.artifact_path().display());
    println!("  timeout: {}ms", cfg.effective_timeout().as_millis());
    if !cfg.env.is_empty() {
        println!("  env:");
        for (k, v) in &cfg.env {
            println!("    {k}={v}");
        }
    }
    println!("  unobserved: {:?}", orchestrator.unobserved_paths());

    debug!("dry-run complete (no build)");
}
