//! # Setting Value Parser
//!
//! Parses the textual `qos.*` setting values the host catalog stores. Two
//! modes share one code path: strict mode (direct `SET qos.*` and
//! `ALTER ... SET qos.*` validation) raises [`ParseError`]; non-strict mode
//! (the pass over persisted catalog entries) ignores foreign names and drops
//! malformed entries with a debug log so one bad row cannot wedge every
//! session that reads it.
//!
//! ## Memory Literal Grammar
//!
//! ```text
//! literal  := ws* sign? digits ws* unit?
//! unit     := k | kB | m | MB | g | GB        (case-insensitive)
//! ```
//!
//! A literal without a unit is kilobytes. The literal `-1` is the unset
//! sentinel and must not carry a unit. Unit multiplication is
//! overflow-checked; overflow is an error, not a wrap.

use smallvec::SmallVec;
use tracing::debug;

use crate::config::QOS_SETTING_PREFIX;
use crate::limits::model::{ErrorLevel, Limits, StatementKind};

const BYTES_PER_KB: i64 = 1024;
const BYTES_PER_MB: i64 = 1024 * 1024;
const BYTES_PER_GB: i64 = 1024 * 1024 * 1024;

/// Error raised by strict validation of a `qos.*` name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidName {
        name: String,
    },
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidName { name } => {
                write!(f, "qos: unrecognized configuration parameter \"{}\"", name)
            }
            ParseError::InvalidValue {
                name,
                value,
                reason,
            } => write!(
                f,
                "qos: invalid value \"{}\" for parameter \"{}\": {}",
                value, name, reason
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Error raised by [`parse_memory`] on a malformed memory literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLiteralError {
    pub literal: String,
    pub reason: &'static str,
}

impl std::fmt::Display for MemoryLiteralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid memory literal \"{}\": {}", self.literal, self.reason)
    }
}

impl std::error::Error for MemoryLiteralError {}

fn literal_err(literal: &str, reason: &'static str) -> MemoryLiteralError {
    MemoryLiteralError {
        literal: literal.to_string(),
        reason,
    }
}

/// Parses a memory literal into bytes.
///
/// Returns `-1` for the unset sentinel. A suffix-less value is kilobytes.
pub fn parse_memory(text: &str) -> Result<i64, MemoryLiteralError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(literal_err(text, "empty value"));
    }

    let digits_end = trimmed
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    let (number, suffix) = trimmed.split_at(digits_end);
    let suffix = suffix.trim();

    let value: i64 = number
        .parse()
        .map_err(|_| literal_err(text, "not a number"))?;

    if value == -1 {
        if !suffix.is_empty() {
            return Err(literal_err(text, "the unset sentinel -1 takes no unit"));
        }
        return Ok(-1);
    }
    if value < 0 {
        return Err(literal_err(text, "negative values other than -1 are not allowed"));
    }

    let factor = match suffix.to_ascii_lowercase().as_str() {
        "" | "k" | "kb" => BYTES_PER_KB,
        "m" | "mb" => BYTES_PER_MB,
        "g" | "gb" => BYTES_PER_GB,
        _ => return Err(literal_err(text, "unknown unit (expected kB, MB, or GB)")),
    };

    value
        .checked_mul(factor)
        .ok_or_else(|| literal_err(text, "value overflows the byte range"))
}

/// Renders a byte count in canonical form: the largest unit that divides it
/// evenly, falling back to kilobytes. `-1` renders as the sentinel.
pub fn format_memory(bytes: i64) -> String {
    if bytes == -1 {
        return "-1".to_string();
    }
    if bytes % BYTES_PER_GB == 0 && bytes != 0 {
        format!("{}GB", bytes / BYTES_PER_GB)
    } else if bytes % BYTES_PER_MB == 0 && bytes != 0 {
        format!("{}MB", bytes / BYTES_PER_MB)
    } else {
        format!("{}kB", bytes / BYTES_PER_KB)
    }
}

/// Splits a catalog `"name=value"` entry, trimming whitespace around both
/// halves.
pub fn parse_entry(text: &str) -> Result<(&str, &str), ParseError> {
    match text.split_once('=') {
        Some((name, value)) => Ok((name.trim(), value.trim())),
        None => Err(ParseError::InvalidValue {
            name: text.trim().to_string(),
            value: String::new(),
            reason: "catalog entry is not of the form name=value".to_string(),
        }),
    }
}

/// All names the governor recognizes under the `qos.` prefix.
pub fn is_valid_name(name: &str) -> bool {
    matches!(
        name,
        "qos.work_mem_limit"
            | "qos.cpu_core_limit"
            | "qos.max_concurrent_tx"
            | "qos.max_concurrent_select"
            | "qos.max_concurrent_update"
            | "qos.max_concurrent_delete"
            | "qos.max_concurrent_insert"
            | "qos.work_mem_error_level"
            | "qos.enabled"
    )
}

fn parse_integer_limit(name: &str, value: &str) -> Result<Option<i32>, ParseError> {
    let parsed: i64 = value.trim().parse().map_err(|_| ParseError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: "not an integer".to_string(),
    })?;
    if parsed == -1 {
        return Ok(None);
    }
    if !(0..=i32::MAX as i64).contains(&parsed) {
        return Err(ParseError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected a non-negative 32-bit integer or -1".to_string(),
        });
    }
    Ok(Some(parsed as i32))
}

fn parse_error_level(name: &str, value: &str) -> Result<ErrorLevel, ParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "warning" => Ok(ErrorLevel::Warning),
        "error" => Ok(ErrorLevel::Error),
        _ => Err(ParseError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected \"warning\" or \"error\"".to_string(),
        }),
    }
}

/// Boolean setting text, as the host accepts it.
pub fn parse_boolean_setting(name: &str, value: &str) -> Result<bool, ParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(ParseError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Applies one textual setting onto `limits`.
///
/// Strict mode returns [`ParseError`] for unknown `qos.*` names, names
/// outside the namespace, and malformed values. Non-strict mode ignores
/// foreign names and drops malformed `qos.*` entries with a debug log,
/// leaving `limits` untouched for that entry.
pub fn apply_value(
    limits: &mut Limits,
    name: &str,
    value: &str,
    strict: bool,
) -> Result<(), ParseError> {
    if !name.starts_with(QOS_SETTING_PREFIX) {
        if strict {
            return Err(ParseError::InvalidName {
                name: name.to_string(),
            });
        }
        return Ok(());
    }

    let result = apply_qos_value(limits, name, value);
    match result {
        Ok(()) => Ok(()),
        Err(err) if strict => Err(err),
        Err(err) => {
            debug!("qos: dropping malformed catalog entry {}={}: {}", name, value, err);
            Ok(())
        }
    }
}

fn apply_qos_value(limits: &mut Limits, name: &str, value: &str) -> Result<(), ParseError> {
    match name {
        "qos.work_mem_limit" => {
            let bytes = parse_memory(value).map_err(|e| ParseError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
                reason: e.reason.to_string(),
            })?;
            limits.work_mem_bytes = if bytes == -1 { None } else { Some(bytes) };
            Ok(())
        }
        "qos.cpu_core_limit" => {
            limits.cpu_core_limit = parse_integer_limit(name, value)?;
            Ok(())
        }
        "qos.max_concurrent_tx" => {
            limits.max_concurrent_tx = parse_integer_limit(name, value)?;
            Ok(())
        }
        "qos.work_mem_error_level" => {
            limits.work_mem_error_level = Some(parse_error_level(name, value)?);
            Ok(())
        }
        // Process-wide flag: validated here, managed by the governor handle
        // rather than stored per scope.
        "qos.enabled" => {
            parse_boolean_setting(name, value)?;
            Ok(())
        }
        _ => {
            for kind in StatementKind::ALL {
                if name
                    .strip_prefix("qos.max_concurrent_")
                    .is_some_and(|suffix| suffix == kind.setting_suffix())
                {
                    let parsed = parse_integer_limit(name, value)?;
                    limits.set_statement_limit(kind, parsed);
                    return Ok(());
                }
            }
            Err(ParseError::InvalidName {
                name: name.to_string(),
            })
        }
    }
}

/// Parses a row's `"name=value"` entries into a fresh [`Limits`], in
/// non-strict mode. Foreign names and malformed entries are skipped.
pub fn limits_from_entries<S: AsRef<str>>(entries: &[S]) -> Limits {
    let mut limits = Limits::default();
    let parsed: SmallVec<[(&str, &str); 8]> = entries
        .iter()
        .filter_map(|entry| parse_entry(entry.as_ref()).ok())
        .collect();
    for (name, value) in parsed {
        // Non-strict application never fails.
        let _ = apply_value(&mut limits, name, value, false);
    }
    limits
}
