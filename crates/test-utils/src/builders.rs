#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use hotbuild::artifact::compute_file_hash;
use hotbuild::BuildConfig;
use tempfile::TempDir;

use crate::fake_compiler::fake_compiler;

pub const DEFAULT_SOURCE: &str = "package main\n\nfunc main() { println(\"hello\") }\n";

/// A throwaway project: one entry point and an output directory.
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("hotbuild-project")
            .tempdir()
            .expect("creating project dir");
        fs::create_dir_all(dir.path().join("out")).expect("creating out dir");
        let fixture = Self { dir };
        fixture.write_source(DEFAULT_SOURCE);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn entry(&self) -> PathBuf {
        self.dir.path().join("main.go")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn write_source(&self, contents: &str) {
        fs::write(self.entry(), contents).expect("writing entry point");
    }

    /// Sync-mode config using the fake compiler; base name `app`, no
    /// extension.
    pub fn config(&self) -> BuildConfig {
        BuildConfig::new(
            fake_compiler().to_string_lossy(),
            self.entry(),
            "app",
            self.out_dir(),
        )
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.out_dir().join(name)
    }

    pub fn hash(&self, name: &str) -> String {
        compute_file_hash(&self.artifact(name)).expect("hashing artifact")
    }

    /// Every file in the output directory with `_temp` in its name.
    pub fn temp_artifacts(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(self.out_dir())
            .expect("reading out dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.contains("_temp"))
            })
            .collect();
        found.sort();
        found
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
