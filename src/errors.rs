use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("cannot resolve base directory {}: {source}", .path.display())]
    Initialization { path: PathBuf, source: io::Error },
    #[error("path must not be empty")]
    EmptyPath,
    #[error("absolute paths are not allowed")]
    AbsolutePathRejected,
    #[error("parent-directory traversal detected")]
    TraversalDetected,
    #[error("path does not match the active whitelist pattern")]
    PatternMismatch,
    #[error("path escapes the base directory")]
    PathEscape,
    #[error("symlink escapes the base directory: {}", .0.display())]
    SymlinkEscape(PathBuf),
    #[error("invalid whitelist pattern: {reason}")]
    InvalidPattern { reason: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Initialization { .. } => "Initialization",
            GateError::EmptyPath => "EmptyPath",
            GateError::AbsolutePathRejected => "AbsolutePathRejected",
            GateError::TraversalDetected => "TraversalDetected",
            GateError::PatternMismatch => "PatternMismatch",
            GateError::PathEscape => "PathEscape",
            GateError::SymlinkEscape(_) => "SymlinkEscape",
            GateError::InvalidPattern { .. } => "InvalidPattern",
            GateError::Unauthorized => "Unauthorized",
            GateError::Io(_) => "Io",
            GateError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GateError::Unauthorized => StatusCode::UNAUTHORIZED,
            GateError::AbsolutePathRejected
            | GateError::TraversalDetected
            | GateError::PathEscape
            | GateError::SymlinkEscape(_) => StatusCode::FORBIDDEN,
            GateError::EmptyPath | GateError::PatternMismatch | GateError::InvalidPattern { .. } => {
                StatusCode::BAD_REQUEST
            }
            GateError::Io(e) => match e.kind() {
                io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GateError::Initialization { .. } | GateError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for rejections made by the path policy itself, as opposed to
    /// failures of the filesystem or the service around it.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            GateError::EmptyPath
                | GateError::AbsolutePathRejected
                | GateError::TraversalDetected
                | GateError::PatternMismatch
                | GateError::PathEscape
                | GateError::SymlinkEscape(_)
        )
    }
}

pub type GateResult<T> = Result<T, GateError>;

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
