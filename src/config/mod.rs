//! # Governor Configuration Module
//!
//! Centralizes the numeric constants the governor is built from. Constants
//! whose values constrain each other live together in [`constants`] with the
//! relationship documented next to them.

pub mod constants;
pub use constants::*;
