// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildError, Result};
use crate::types::OutputExtension;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_required(&raw)?;

        let extension: OutputExtension = raw
            .build
            .extension
            .parse()
            .map_err(|e: String| BuildError::Config(format!("[build].extension: {e}")))?;

        let timeout = match raw.build.timeout.as_deref() {
            Some(s) => Some(
                parse_timeout(s)
                    .map_err(|e| BuildError::Config(format!("[build].timeout: {e}")))?,
            ),
            None => None,
        };

        Ok(ConfigFile {
            compiler: raw.build.compiler,
            entry: raw.build.entry,
            out_name: raw.build.out_name,
            extension,
            out_dir: raw.build.out_dir,
            args: raw.build.args,
            timeout,
            env: raw.env,
        })
    }
}

fn validate_required(cfg: &RawConfigFile) -> Result<()> {
    let b = &cfg.build;
    let required = [
        ("compiler", b.compiler.trim().is_empty()),
        ("entry", b.entry.as_os_str().is_empty()),
        ("out_name", b.out_name.trim().is_empty()),
        ("out_dir", b.out_dir.as_os_str().is_empty()),
    ];

    for (field, missing) in required {
        if missing {
            return Err(BuildError::Config(format!(
                "[build].{field} must not be empty"
            )));
        }
    }

    if b.out_name.contains('/') || b.out_name.contains('\\') {
        return Err(BuildError::Config(format!(
            "[build].out_name {:?} must be a bare file name; use out_dir for the directory",
            b.out_name
        )));
    }

    for key in cfg.env.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(BuildError::Config(format!(
                "[env] key {key:?} is not a valid variable name"
            )));
        }
    }

    Ok(())
}

/// Parse a per-build deadline. Zero is rejected.
pub fn parse_timeout(s: &str) -> std::result::Result<Duration, String> {
    let dur = parse_duration(s)?;
    if dur.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(dur)
}

/// Parse `"<n><unit>"` with unit `ms`, `s`, `m` or `h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' out of range", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration(" 30s "), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn oversized_durations_are_errors() {
        let err = parse_duration("6000000000000000h").unwrap_err();
        assert!(err.contains("out of range"), "{err}");
        assert!(parse_duration("400000000000000000m").is_err());
        assert_eq!(
            parse_duration("18446744073709551615s"),
            Ok(Duration::from_secs(u64::MAX))
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("0ms").is_err());
        assert_eq!(parse_timeout("1ms"), Ok(Duration::from_millis(1)));
    }

    #[test]
    fn zero_timeout_in_config_is_a_config_error() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[build]
compiler = "go"
entry = "main.go"
out_name = "app"
out_dir = "bin"
timeout = "0s"
"#,
        )
        .unwrap();
        match ConfigFile::try_from(raw) {
            Err(BuildError::Config(msg)) => assert!(msg.contains("greater than zero"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
