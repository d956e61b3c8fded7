//! # Client-Facing Errors
//!
//! The errors the host must surface to clients carry the host error code
//! plus the three-part message/detail/hint shape of the host's error
//! channel. They travel through `eyre::Report` like every other error in the
//! crate; the FFI boundary recovers them with `downcast_ref` to fill the
//! host's error fields.

use crate::limits::StatementKind;

/// Host error codes the governor maps its refusals onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Work-memory rejection.
    InsufficientResources,
    /// Concurrency rejection.
    ProgramLimitExceeded,
}

impl ErrorCode {
    /// Five-character SQLSTATE the host wire protocol expects.
    pub fn sqlstate(&self) -> &'static str {
        match self {
            ErrorCode::InsufficientResources => "53000",
            ErrorCode::ProgramLimitExceeded => "54000",
        }
    }
}

/// What was being admitted when a concurrency limit was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Transactions,
    Statements(StatementKind),
}

/// Concurrency admission refusal: `current` peers already hold the resource
/// and the effective limit is `max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitExceeded {
    pub kind: LimitKind,
    pub current: u32,
    pub max: i32,
}

impl LimitExceeded {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ProgramLimitExceeded
    }

    pub fn message(&self) -> String {
        match self.kind {
            LimitKind::Transactions => "qos: maximum concurrent transactions exceeded".to_string(),
            LimitKind::Statements(kind) => format!(
                "qos: maximum concurrent {} statements exceeded",
                kind.keyword()
            ),
        }
    }

    pub fn detail(&self) -> String {
        format!("Current: {}, Maximum: {}", self.current, self.max)
    }

    pub fn hint(&self) -> String {
        match self.kind {
            LimitKind::Transactions => "Wait for other transactions to complete".to_string(),
            LimitKind::Statements(kind) => {
                format!("Wait for other {} queries to complete", kind.keyword())
            }
        }
    }
}

impl std::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.detail())
    }
}

impl std::error::Error for LimitExceeded {}

/// `SET work_mem` refusal under `work_mem_error_level = error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkMemExceeded {
    pub requested_kb: i64,
    pub max_kb: i64,
}

impl WorkMemExceeded {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InsufficientResources
    }

    pub fn message(&self) -> String {
        "qos: work_mem limit exceeded".to_string()
    }

    pub fn detail(&self) -> String {
        format!(
            "Requested {} KB, maximum allowed is {} KB",
            self.requested_kb, self.max_kb
        )
    }

    pub fn hint(&self) -> String {
        "Contact administrator to increase qos.work_mem_limit".to_string()
    }
}

impl std::fmt::Display for WorkMemExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.detail())
    }
}

impl std::error::Error for WorkMemExceeded {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_exceeded_text() {
        let err = LimitExceeded {
            kind: LimitKind::Statements(StatementKind::Select),
            current: 2,
            max: 2,
        };
        assert_eq!(err.message(), "qos: maximum concurrent SELECT statements exceeded");
        assert_eq!(err.detail(), "Current: 2, Maximum: 2");
        assert_eq!(err.code().sqlstate(), "54000");
    }

    #[test]
    fn test_work_mem_exceeded_text() {
        let err = WorkMemExceeded {
            requested_kb: 65536,
            max_kb: 32768,
        };
        assert_eq!(err.detail(), "Requested 65536 KB, maximum allowed is 32768 KB");
        assert_eq!(err.code().sqlstate(), "53000");
    }
}
