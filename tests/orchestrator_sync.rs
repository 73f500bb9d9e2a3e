#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hotbuild::types::BuildStage;
use hotbuild::{BuildError, BuildFailure, Orchestrator};
use hotbuild_test_utils::{ProjectFixture, fake_compiler, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn successful_build_commits_artifact_and_leaves_no_temp() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    let orch = Orchestrator::new(project.config().with_extension(".exe"));
    with_timeout(orch.trigger()).await?;

    assert!(project.artifact("app.exe").is_file());
    assert!(project.temp_artifacts().is_empty());
    assert!(!orch.is_active());
    assert_eq!(orch.active_job(), None);
    Ok(())
}

#[tokio::test]
async fn command_line_matches_example_scenario() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();
    let orch = Orchestrator::new(project.config().with_extension(".exe"));

    let cmd = orch.command_line();
    assert_eq!(cmd.len(), 5);
    assert_eq!(cmd[1], "build");
    assert_eq!(cmd[2], "-o");
    assert_eq!(
        cmd[3],
        project.out_dir().join("app_temp.exe").to_string_lossy()
    );
    assert_eq!(cmd[4], project.entry().to_string_lossy());
    Ok(())
}

#[tokio::test]
async fn compiler_receives_per_job_temp_path_and_merged_ldflags() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();
    let args_file = project.root().join("args.txt");

    let cfg = project
        .config()
        .with_extension(".exe")
        .with_env("FAKE_COMPILER_ARGS_FILE", args_file.to_string_lossy())
        .with_extra_args(|| {
            vec![
                "-X".to_string(),
                "main.version=1".to_string(),
                "-trimpath".to_string(),
                "-X main.secret=3".to_string(),
            ]
        });
    let orch = Orchestrator::new(cfg);
    with_timeout(orch.trigger()).await?;

    let seen = fs::read_to_string(&args_file)?;
    let seen: Vec<&str> = seen.lines().collect();
    assert_eq!(seen[0], "build");
    assert_eq!(seen[1], "-trimpath");
    assert_eq!(seen[2], "-ldflags=-X main.version=1 -X main.secret=3");
    assert_eq!(seen[3], "-o");

    let temp_name = std::path::Path::new(seen[4])
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("temp path has no file name")?
        .to_string();
    assert!(temp_name.starts_with("app_temp"));
    assert!(temp_name.ends_with(".exe"));
    assert_ne!(temp_name, "app_temp.exe");
    assert_eq!(seen[5], project.entry().to_string_lossy());
    Ok(())
}

#[tokio::test]
async fn extra_args_supplier_runs_on_every_trigger() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cfg = project.config().with_extra_args(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        vec![format!("-X main.build={n}")]
    });
    let orch = Orchestrator::new(cfg);

    with_timeout(orch.trigger()).await?;
    let first = project.hash("app");
    with_timeout(orch.trigger()).await?;
    let second = project.hash("app");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_ne!(first, second, "changed ldflags must change the artifact");
    Ok(())
}

#[tokio::test]
async fn rebuild_with_unchanged_inputs_is_idempotent() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();
    let orch = Orchestrator::new(project.config());

    with_timeout(orch.trigger()).await?;
    let first = project.hash("app");
    with_timeout(orch.trigger()).await?;
    let second = project.hash("app");

    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn env_toggle_changes_the_artifact() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    let plain = Orchestrator::new(project.config());
    with_timeout(plain.trigger()).await?;
    let first = project.hash("app");

    let toggled = Orchestrator::new(project.config().with_env("FAKE_COMPILER_VARIANT", "b"));
    with_timeout(toggled.trigger()).await?;
    let second = project.hash("app");

    assert_ne!(first, second);
    Ok(())
}

#[tokio::test]
async fn source_change_changes_the_artifact() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();
    let orch = Orchestrator::new(project.config());

    with_timeout(orch.trigger()).await?;
    let first = project.hash("app");

    project.write_source("package main\n\nfunc main() { println(\"changed\") }\n");
    with_timeout(orch.trigger()).await?;

    assert_ne!(first, project.hash("app"));
    Ok(())
}

#[tokio::test]
async fn failed_build_preserves_previous_artifact() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    let good = Orchestrator::new(project.config());
    with_timeout(good.trigger()).await?;
    let before_hash = project.hash("app");
    let before_mtime = fs::metadata(project.artifact("app"))?.modified()?;

    let bad = Orchestrator::new(project.config().with_env("FAKE_COMPILER_FAIL", "1"));
    let err = with_timeout(bad.trigger())
        .await
        .expect_err("failing compiler must fail the build");

    assert_eq!(err.stage(), BuildStage::Build);
    match &err {
        BuildError::Build {
            reason: BuildFailure::Exit(Some(2)),
            output,
        } => assert!(output.contains("fake compile error")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("fake compile error"));

    assert_eq!(project.hash("app"), before_hash);
    assert_eq!(fs::metadata(project.artifact("app"))?.modified()?, before_mtime);
    assert!(project.temp_artifacts().is_empty());
    assert!(!bad.is_active());
    Ok(())
}

#[tokio::test]
async fn missing_entry_point_discards_partial_output() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();
    fs::remove_file(project.entry())?;

    let orch = Orchestrator::new(project.config());
    let err = with_timeout(orch.trigger())
        .await
        .expect_err("missing entry point must fail");

    assert_eq!(err.stage(), BuildStage::Build);
    assert!(!project.artifact("app").exists());
    assert!(project.temp_artifacts().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_compiler_is_a_setup_failure() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    let mut cfg = project.config();
    cfg.compiler = project
        .root()
        .join("no-such-compiler")
        .to_string_lossy()
        .into_owned();
    let orch = Orchestrator::new(cfg);

    let err = with_timeout(orch.trigger())
        .await
        .expect_err("must fail to start");
    assert_eq!(err.stage(), BuildStage::Setup);
    assert!(matches!(err, BuildError::Setup { .. }));
    assert!(!orch.is_active());
    assert!(project.temp_artifacts().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_output_directory_is_a_failure_without_artifact() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    let mut cfg = project.config();
    cfg.out_dir = project.root().join("does-not-exist");
    let orch = Orchestrator::new(cfg);

    // The compiler cannot write its temp artifact into a missing directory.
    let err = with_timeout(orch.trigger())
        .await
        .expect_err("must fail");
    assert_ne!(err.stage(), BuildStage::Setup);
    assert!(!orch.artifact_path().exists());
    Ok(())
}

#[tokio::test]
async fn deadline_expiry_fails_the_build() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    let cfg = project
        .config()
        .with_env("FAKE_COMPILER_SLEEP", "3")
        .with_timeout(std::time::Duration::from_millis(200));
    let orch = Orchestrator::new(cfg);

    let err = with_timeout(orch.trigger())
        .await
        .expect_err("must time out");
    assert!(matches!(
        err,
        BuildError::Build {
            reason: BuildFailure::TimedOut(_),
            ..
        }
    ));
    assert!(!project.artifact("app").exists());
    assert!(project.temp_artifacts().is_empty());
    Ok(())
}

#[tokio::test]
async fn unobserved_paths_report_canonical_names() -> TestResult {
    let project = ProjectFixture::new();
    let orch = Orchestrator::new(project.config().with_extension(".wasm"));
    assert_eq!(orch.unobserved_paths(), vec!["app.wasm", "app_temp.wasm"]);
    Ok(())
}

#[tokio::test]
async fn rename_failure_is_a_commit_error_and_discards_the_temp() -> TestResult {
    init_tracing();
    fake_compiler();
    let project = ProjectFixture::new();

    // A non-empty directory where the artifact should go cannot be renamed over.
    let blocker = project.artifact("app");
    fs::create_dir(&blocker)?;
    fs::write(blocker.join("keep"), "occupied")?;

    let orch = Orchestrator::new(project.config());
    let err = with_timeout(orch.trigger())
        .await
        .expect_err("rename must fail");

    assert_eq!(err.stage(), BuildStage::Commit);
    match &err {
        BuildError::Commit(rename) => {
            assert_eq!(rename.to, blocker);
            assert!(rename.from.to_string_lossy().contains("app_temp"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(blocker.join("keep").is_file());
    assert!(project.temp_artifacts().is_empty());
    assert!(!orch.is_active());
    Ok(())
}
