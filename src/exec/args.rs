// src/exec/args.rs

//! Compiler command-line assembly.
//!
//! Linker-symbol flags (`-X key=value`) may be supplied either as two tokens
//! (`"-X"`, `"key=value"`) or already joined (`"-X key=value"`). Compilers
//! only accept them inside a single `-ldflags` value, so they are pulled out
//! of the pass-through list and merged into one `-ldflags=...` token that
//! always sits right before `-o`.

use std::path::Path;

/// First token of every invocation.
pub const BUILD_SUBCOMMAND: &str = "build";
/// Output-target flag; followed by the temp artifact path.
pub const OUTPUT_FLAG: &str = "-o";

const LINKER_SYMBOL_FLAG: &str = "-X";
const LDFLAGS_PREFIX: &str = "-ldflags=";

/// Build the argument list (executable name excluded) for one compilation.
///
/// Resulting layout:
///
/// `build <pass-through...> [-ldflags=<linker flags>] -o <temp> <entry>`
pub fn build_arguments(
    passthrough: &[String],
    temp_artifact: &Path,
    entry_point: &Path,
) -> Vec<String> {
    let mut args = Vec::with_capacity(passthrough.len() + 4);
    args.push(BUILD_SUBCOMMAND.to_string());

    let mut ld_flags: Vec<&str> = Vec::new();
    let mut tokens = passthrough.iter();

    while let Some(arg) = tokens.next() {
        if !arg.starts_with(LINKER_SYMBOL_FLAG) {
            args.push(arg.clone());
            continue;
        }

        ld_flags.push(arg);
        // Bare `-X` owns the next token as its payload.
        if arg == LINKER_SYMBOL_FLAG {
            if let Some(payload) = tokens.next() {
                ld_flags.push(payload);
            }
        }
    }

    if !ld_flags.is_empty() {
        args.push(format!("{LDFLAGS_PREFIX}{}", ld_flags.join(" ")));
    }

    args.push(OUTPUT_FLAG.to_string());
    args.push(temp_artifact.to_string_lossy().into_owned());
    args.push(entry_point.to_string_lossy().into_owned());
    args
}
