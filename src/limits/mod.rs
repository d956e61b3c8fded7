//! # Limit Model and Setting Parser
//!
//! This module defines the limit aggregate the rest of the governor consumes
//! and the parser for the `qos.*` settings the host catalog stores as
//! `"name=value"` text entries.
//!
//! ## Module Structure
//!
//! - [`model`]: the [`Limits`] aggregate, statement kinds, the error-level
//!   policy, and the most-restrictive fold
//! - [`parse`]: memory-literal grammar, entry splitting, and strict /
//!   non-strict application of textual values onto a [`Limits`]
//!
//! ## Unset Semantics
//!
//! Every bound is optional. `None` means "no limit configured at this
//! scope"; the wire representation `-1` is accepted by the parser and
//! produced when rendering. A limit of `0` is a configured bound (admit
//! nothing), not "unset".

pub mod model;
pub mod parse;

pub use model::{ErrorLevel, Limits, StatementKind};
pub use parse::{
    apply_value, format_memory, is_valid_name, limits_from_entries, parse_boolean_setting,
    parse_entry, parse_memory, MemoryLiteralError, ParseError,
};
