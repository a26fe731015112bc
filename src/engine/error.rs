//! Errors crossing the host boundary.
//!
//! Every failure leaving [`MediaBridge`](crate::engine::bridge::MediaBridge) is a
//! [`BridgeError`] with a stable [`ErrorCode`]. Raw platform faults never cross.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for host-facing operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Failure taxonomy behind the codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Caller misuse, never retried
    InvalidArgument,
    /// Target or staging absent
    NotFound,
    /// Drives the consent sub-flow
    PermissionRecoverable,
    PermissionTerminal,
    IoFailure,
    UnsupportedCapability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    ResolveError,
    FileAccessError,
    FileNotFound,
    ConsentRequired,
    ConsentError,
    SecurityError,
    ReplaceFailed,
    NoActivity,
    PermissionError,
    UnsupportedVersion,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 11] = [
        ErrorCode::InvalidArgument,
        ErrorCode::ResolveError,
        ErrorCode::FileAccessError,
        ErrorCode::FileNotFound,
        ErrorCode::ConsentRequired,
        ErrorCode::ConsentError,
        ErrorCode::SecurityError,
        ErrorCode::ReplaceFailed,
        ErrorCode::NoActivity,
        ErrorCode::PermissionError,
        ErrorCode::UnsupportedVersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::ResolveError => "RESOLVE_ERROR",
            ErrorCode::FileAccessError => "FILE_ACCESS_ERROR",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::ConsentRequired => "CONSENT_REQUIRED",
            ErrorCode::ConsentError => "CONSENT_ERROR",
            ErrorCode::SecurityError => "SECURITY_ERROR",
            ErrorCode::ReplaceFailed => "REPLACE_FAILED",
            ErrorCode::NoActivity => "NO_ACTIVITY",
            ErrorCode::PermissionError => "PERMISSION_ERROR",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ErrorCode::InvalidArgument => FailureKind::InvalidArgument,
            ErrorCode::FileNotFound => FailureKind::NotFound,
            ErrorCode::ConsentRequired => FailureKind::PermissionRecoverable,
            ErrorCode::SecurityError | ErrorCode::FileAccessError => {
                FailureKind::PermissionTerminal
            }
            ErrorCode::UnsupportedVersion => FailureKind::UnsupportedCapability,
            ErrorCode::ResolveError
            | ErrorCode::ConsentError
            | ErrorCode::ReplaceFailed
            | ErrorCode::NoActivity
            | ErrorCode::PermissionError => FailureKind::IoFailure,
        }
    }

    /// Only a consent-required failure has a follow-up attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::ConsentRequired)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
    /// Set on CONSENT_REQUIRED; the grant answer arrives keyed by this token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            correlation_token: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn consent_required(token: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ConsentRequired,
            message: "User consent required for file replacement".to_string(),
            correlation_token: Some(token.into()),
        }
    }
}
