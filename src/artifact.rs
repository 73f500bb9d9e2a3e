// src/artifact.rs

//! Artifact naming and the commit/rollback protocol.
//!
//! The compiler always writes to a temp artifact named
//! `<base>_temp<token><ext>`. A successful build is committed with a single
//! `rename` over `<base><ext>`, so the final artifact is either fully replaced
//! or left as it was. A failed build only ever deletes its own temp file.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use blake3::Hasher;
use tracing::debug;

use crate::errors::RenameError;

const TEMP_MARKER: &str = "_temp";

/// Process-wide sequence so two temp names minted in the same clock tick
/// still differ.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ArtifactManager {
    out_dir: PathBuf,
    out_name: String,
    extension: String,
}

impl ArtifactManager {
    pub fn new(
        out_dir: impl Into<PathBuf>,
        out_name: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            out_dir: out_dir.into(),
            out_name: out_name.into(),
            extension: extension.into(),
        }
    }

    /// `<base><ext>`
    pub fn artifact_name(&self) -> String {
        format!("{}{}", self.out_name, self.extension)
    }

    /// `<base>_temp<ext>`: the name file watchers are told to ignore.
    pub fn canonical_temp_name(&self) -> String {
        format!("{}{}{}", self.out_name, TEMP_MARKER, self.extension)
    }

    /// Fresh `<base>_temp<token><ext>`, unique per call within the process.
    ///
    /// The token combines the trigger time in nanoseconds with a sequence
    /// number.
    pub fn temp_artifact_name(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}{}{}-{}{}",
            self.out_name, TEMP_MARKER, nanos, seq, self.extension
        )
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.out_dir.join(self.artifact_name())
    }

    pub fn temp_path(&self, temp_name: &str) -> PathBuf {
        self.out_dir.join(temp_name)
    }

    /// Rename the temp artifact over the final artifact.
    pub fn commit(&self, temp_name: &str) -> Result<(), RenameError> {
        let from = self.temp_path(temp_name);
        let to = self.artifact_path();

        fs::rename(&from, &to).map_err(|source| RenameError {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;

        debug!(from = ?from, to = ?to, "committed artifact");
        Ok(())
    }

    /// Best-effort removal of a temp artifact.
    pub fn discard(&self, temp_name: &str) {
        let path = self.temp_path(temp_name);
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = ?path, "discarded temp artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = ?path, error = %e, "failed to discard temp artifact"),
        }
    }

    /// Names external file watchers should ignore: the final artifact and
    /// the canonical temp name.
    pub fn unobserved_paths(&self) -> Vec<String> {
        vec![self.artifact_name(), self.canonical_temp_name()]
    }

    /// blake3 hex digest of the final artifact, `None` if it does not exist.
    pub fn artifact_digest(&self) -> anyhow::Result<Option<String>> {
        let path = self.artifact_path();
        if !path.is_file() {
            return Ok(None);
        }
        compute_file_hash(&path).map(Some)
    }
}

/// blake3 hex digest of a file's contents.
pub fn compute_file_hash(path: &Path) -> anyhow::Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn unobserved_paths_with_extension() {
        let m = ArtifactManager::new("out", "myapp", ".exe");
        assert_eq!(m.unobserved_paths(), vec!["myapp.exe", "myapp_temp.exe"]);
    }

    #[test]
    fn unobserved_paths_without_extension() {
        let m = ArtifactManager::new("out", "myapp", "");
        assert_eq!(m.unobserved_paths(), vec!["myapp", "myapp_temp"]);
    }

    #[test]
    fn temp_names_are_unique_and_keep_the_extension() {
        let m = ArtifactManager::new("out", "app", ".exe");
        let names: HashSet<String> = (0..1000).map(|_| m.temp_artifact_name()).collect();
        assert_eq!(names.len(), 1000);
        for name in &names {
            assert!(name.starts_with("app_temp"));
            assert!(name.ends_with(".exe"));
        }
    }

    #[test]
    fn commit_replaces_the_artifact() {
        let dir = tempdir().unwrap();
        let m = ArtifactManager::new(dir.path(), "testapp", ".exe");
        fs::write(m.artifact_path(), b"old").unwrap();

        let temp = m.temp_artifact_name();
        fs::write(m.temp_path(&temp), b"new").unwrap();

        m.commit(&temp).unwrap();
        assert_eq!(fs::read(m.artifact_path()).unwrap(), b"new");
        assert!(!m.temp_path(&temp).exists());
    }

    #[test]
    fn commit_of_missing_temp_leaves_artifact_alone() {
        let dir = tempdir().unwrap();
        let m = ArtifactManager::new(dir.path(), "testapp", ".exe");
        fs::write(m.artifact_path(), b"old").unwrap();

        let err = m.commit(&m.temp_artifact_name()).unwrap_err();
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
        assert_eq!(fs::read(m.artifact_path()).unwrap(), b"old");
    }

    #[test]
    fn commit_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let m = ArtifactManager::new(dir.path(), "testapp", "");
        let temp = m.temp_artifact_name();
        fs::write(m.temp_path(&temp), b"bin").unwrap();

        let broken = ArtifactManager::new(dir.path().join("missing"), "testapp", "");
        assert!(broken.commit(&temp).is_err());
    }

    #[test]
    fn discard_is_silent_for_missing_files() {
        let dir = tempdir().unwrap();
        let m = ArtifactManager::new(dir.path(), "app", "");
        let temp = m.temp_artifact_name();
        m.discard(&temp);

        fs::write(m.temp_path(&temp), b"partial").unwrap();
        m.discard(&temp);
        assert!(!m.temp_path(&temp).exists());
    }

    #[test]
    fn digest_tracks_content() {
        let dir = tempdir().unwrap();
        let m = ArtifactManager::new(dir.path(), "app", "");
        assert_eq!(m.artifact_digest().unwrap(), None);

        fs::write(m.artifact_path(), b"one").unwrap();
        let first = m.artifact_digest().unwrap();
        fs::write(m.artifact_path(), b"two").unwrap();
        let second = m.artifact_digest().unwrap();

        assert!(first.is_some());
        assert_ne!(first, second);
    }
}
