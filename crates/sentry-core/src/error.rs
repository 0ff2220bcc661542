// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every engine component.
//!
//! Kinds map 1:1 onto the HTTP status codes and machine-readable `code`
//! strings the server surface returns (see `sentry-server::transport`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error kinds produced by the engine. Every fallible engine operation
/// returns `Result<T, SentryError>`.
#[derive(Debug, thiserror::Error)]
pub enum SentryError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid argument: {0}")]
    InvalidInput(String),

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file too large: {0}")]
    FileTooLarge(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("truncation detected mid-read: {0}")]
    Stale(String),

    #[error("rate limit exceeded")]
    Overloaded,

    #[error("operation cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable codes returned alongside each HTTP error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidPath,
    InvalidInput,
    InvalidRegex,
    InvalidTimeFormat,
    FileNotFound,
    PermissionDenied,
    FileTooLarge,
    RateLimitExceeded,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidRegex => "INVALID_REGEX",
            Self::InvalidTimeFormat => "INVALID_TIME_FORMAT",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SentryError {
    /// HTTP status this error kind maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidPath(_)
            | Self::InvalidInput(_)
            | Self::InvalidRegex(_)
            | Self::InvalidTimeFormat(_) => 400,
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::Stale(_) => 409,
            Self::Overloaded => 429,
            Self::FileTooLarge(_) => 404,
            Self::Cancelled => 499,
            Self::Io(_) | Self::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPath(_) => ErrorCode::InvalidPath,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::InvalidRegex(_) => ErrorCode::InvalidRegex,
            Self::InvalidTimeFormat(_) => ErrorCode::InvalidTimeFormat,
            Self::NotFound(_) => ErrorCode::FileNotFound,
            Self::FileTooLarge(_) => ErrorCode::FileTooLarge,
            Self::Forbidden(_) => ErrorCode::PermissionDenied,
            Self::Overloaded => ErrorCode::RateLimitExceeded,
            Self::Stale(_) | Self::Cancelled | Self::Io(_) | Self::Internal(_) => {
                ErrorCode::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SentryError>;
