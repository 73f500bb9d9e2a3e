//! A shell script standing in for a real compiler.
//!
//! Invoked as `<script> build [flags...] -o <out> <entry>`, like `go build`.
//! It writes `<out>` from the entry file's contents plus the flags it was
//! given, so the artifact changes whenever the source, the flags or
//! `FAKE_COMPILER_VARIANT` change.
//!
//! Behaviour is steered through the environment (the orchestrator's `env`
//! overlay):
//! - `FAKE_COMPILER_SLEEP`: seconds to sleep before writing output
//! - `FAKE_COMPILER_FAIL`: when non-empty, print an error and exit 2
//! - `FAKE_COMPILER_VARIANT`: mixed into the artifact contents
//! - `FAKE_COMPILER_ARGS_FILE`: when set, every argument is written there,
//!   one per line

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tempfile::TempDir;

const SCRIPT_SOURCE: &str = r#"#!/bin/sh
if [ -n "$FAKE_COMPILER_ARGS_FILE" ]; then
    printf '%s\n' "$@" > "$FAKE_COMPILER_ARGS_FILE"
fi

out=""
entry=""
flags=""
while [ $# -gt 0 ]; do
    case "$1" in
        -o) out="$2"; shift 2 ;;
        *)
            if [ -n "$entry" ]; then flags="$flags $entry"; fi
            entry="$1"
            shift
            ;;
    esac
done

echo "fake compiler: building $entry"

if [ -n "$FAKE_COMPILER_SLEEP" ]; then
    sleep "$FAKE_COMPILER_SLEEP"
fi

if [ -n "$FAKE_COMPILER_FAIL" ]; then
    echo "$entry:1:1: fake compile error" >&2
    exit 2
fi

{
    printf 'fake-binary variant=%s flags=%s\n' "${FAKE_COMPILER_VARIANT:-default}" "$flags"
    cat "$entry" || exit 1
} > "$out"
"#;

static SCRIPT: OnceLock<(TempDir, PathBuf)> = OnceLock::new();

/// Path to the fake compiler, written once per test binary.
///
/// Call this before spawning any process in a test so the script is never
/// executed while still open for writing.
pub fn fake_compiler() -> &'static Path {
    let (_dir, path) = SCRIPT.get_or_init(|| {
        let dir = tempfile::Builder::new()
            .prefix("hotbuild-fake-compiler")
            .tempdir()
            .expect("creating fake compiler dir");
        let path = dir.path().join("fakec");
        write_script(&path);
        (dir, path)
    });
    path
}

#[cfg(unix)]
fn write_script(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, SCRIPT_SOURCE).expect("writing fake compiler");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("marking fake compiler executable");
}

#[cfg(not(unix))]
fn write_script(_path: &Path) {
    panic!("the fake compiler needs a POSIX shell");
}
