//! Error types for the OCR3 capability.
//!
//! Caller errors (`AlreadyExists`, `Decode`, `Unsupported`) are surfaced
//! synchronously from `execute` / `register_to_workflow` and never retried.
//! Everything else propagates as a value to whichever phase hit it.

use std::fmt::Display;

/// OCR3 capability error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("Request already exists for execution {0}")]
    AlreadyExists(String),

    #[error("Request not found for execution {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("Unsupported {kind}: {name}")]
    Unsupported { kind: &'static str, name: String },

    #[error("Request context canceled for execution {0}")]
    Canceled(String),

    #[error("{what} too large: {size} bytes > {limit} bytes")]
    LimitExceeded {
        what: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Capability registry error: {0}")]
    Registry(String),

    #[error("Capability is closed")]
    Closed,
}

impl CapabilityError {
    pub fn decode(what: &'static str, reason: impl Display) -> Self {
        Self::Decode {
            what,
            reason: reason.to_string(),
        }
    }

    pub fn unsupported(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Unsupported {
            kind,
            name: name.into(),
        }
    }

    /// True for errors caused by a malformed or duplicate caller request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_) | Self::Decode { .. } | Self::Unsupported { .. }
        )
    }
}

/// Result type for capability operations
pub type CapabilityResult<T> = Result<T, CapabilityError>;
