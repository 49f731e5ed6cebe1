//! Per-request error taxonomy.
//!
//! Every failure inside a worker connection loop is represented as a
//! [`ServerError`] and mapped to a response status at the loop boundary,
//! instead of letting individual call sites decide how to report.

use std::io;

use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::response::StatusCode;

/// A failure while serving one connection.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller is authenticated but not allowed to do this.
    #[error("security violation: {0}")]
    Security(String),

    /// The matched route cannot perform the requested action.
    #[error("action not supported: {0}")]
    NotSupported(String),

    /// Client-side mistake reported by a handler, e.g. an unknown
    /// session identifier.
    #[error("{0}")]
    BadRequest(String),

    /// The request exceeded the configured message size limit. This is
    /// connection-fatal, never a silent truncation.
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    /// The request could not be parsed as HTTP.
    #[error("malformed request: {0}")]
    Malformed(ParseError),

    /// Socket failure; no response can be attempted.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Anything else a handler reports.
    #[error("{0}")]
    Internal(String),
}

impl From<ParseError> for ServerError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::TooLarge { size, limit } => ServerError::TooLarge { size, limit },
            other => ServerError::Malformed(other),
        }
    }
}

impl ServerError {
    /// Status code reported to the client for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Security(_) => StatusCode::Forbidden,
            ServerError::NotSupported(_) => StatusCode::NotFound,
            ServerError::BadRequest(_) | ServerError::Malformed(_) => StatusCode::BadRequest,
            ServerError::TooLarge { .. } => StatusCode::PayloadTooLarge,
            ServerError::Io(_) | ServerError::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Connection directive advertised on the error response. The
    /// connection is closed afterwards either way; security and
    /// not-supported reports keep the directive the handler-facing
    /// errors have always carried.
    pub fn keep_alive_after_report(&self) -> bool {
        matches!(
            self,
            ServerError::Security(_) | ServerError::NotSupported(_) | ServerError::BadRequest(_)
        )
    }
}
