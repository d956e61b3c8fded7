//! # Host Identity Types
//!
//! Newtypes for the identities the host hands the governor: role and database
//! OIDs and the stable per-backend slot index. They are plain wrappers so that
//! an admission scan can never confuse a role with a database; the public
//! inner field serializes back to the host's integer expectation at the FFI
//! boundary.

use std::fmt;

/// Authenticated role identity, as assigned by the host's role catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(pub u32);

/// Database identity, as assigned by the host's database catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseId(pub u32);

/// Stable per-backend slot index, in `0..max_backends`.
///
/// The host guarantees the index is unique among live sessions and reused
/// only after the previous owner exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendId(pub usize);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
