//! Error types for the CouchDB client

use couchdb_core::{CoreError, ErrorBody};
use reqwest::StatusCode;

/// CouchDB client error
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected before sending: bad name, user id, proxy, argument or URL
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// 400: malformed request URL, path, headers or body
    #[error("Bad request: {0}")]
    BadRequest(ErrorBody),

    /// 401: missing or rejected credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorBody),

    /// 403
    #[error("Forbidden: {0}")]
    Forbidden(ErrorBody),

    /// 404
    #[error("Not found: {0}")]
    NotFound(ErrorBody),

    /// 405
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(ErrorBody),

    /// 406
    #[error("Not acceptable: {0}")]
    NotAcceptable(ErrorBody),

    /// 409: update conflict, the revision is stale
    #[error("Conflict: {0}")]
    Conflict(ErrorBody),

    /// 412: e.g. the database already exists
    #[error("Precondition failed: {0}")]
    PreconditionFailed(ErrorBody),

    /// 413: document or request exceeds the configured maximum size
    #[error("Request entity too large: {0}")]
    RequestEntityTooLarge(ErrorBody),

    /// 415
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(ErrorBody),

    /// 416
    #[error("Requested range not satisfiable: {0}")]
    RequestRangeNotSatisfiable(ErrorBody),

    /// 417: a bulk load operation failed
    #[error("Expectation failed: {0}")]
    ExpectationFailed(ErrorBody),

    /// 500
    #[error("Internal server error: {0}")]
    InternalServer(ErrorBody),

    /// Any other error status
    #[error("Server error: {status} - {body}")]
    Server { status: u16, body: ErrorBody },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Translate an HTTP status into an error. Statuses below 400 are not errors.
    pub fn from_status(status: StatusCode, body: &str) -> Option<Self> {
        if status.as_u16() < 400 {
            return None;
        }
        let body = ErrorBody::from_text(body);
        Some(match status.as_u16() {
            400 => Self::BadRequest(body),
            401 => Self::Unauthorized(body),
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            405 => Self::MethodNotAllowed(body),
            406 => Self::NotAcceptable(body),
            409 => Self::Conflict(body),
            412 => Self::PreconditionFailed(body),
            413 => Self::RequestEntityTooLarge(body),
            415 => Self::UnsupportedMediaType(body),
            416 => Self::RequestRangeNotSatisfiable(body),
            417 => Self::ExpectationFailed(body),
            500 => Self::InternalServer(body),
            status => Self::Server { status, body },
        })
    }

    /// HTTP status behind this error, if it came from the server
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::MethodNotAllowed(_) => Some(405),
            Self::NotAcceptable(_) => Some(406),
            Self::Conflict(_) => Some(409),
            Self::PreconditionFailed(_) => Some(412),
            Self::RequestEntityTooLarge(_) => Some(413),
            Self::UnsupportedMediaType(_) => Some(415),
            Self::RequestRangeNotSatisfiable(_) => Some(416),
            Self::ExpectationFailed(_) => Some(417),
            Self::InternalServer(_) => Some(500),
            Self::Server { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-reported `{error, reason}`, if any
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::BadRequest(body)
            | Self::Unauthorized(body)
            | Self::Forbidden(body)
            | Self::NotFound(body)
            | Self::MethodNotAllowed(body)
            | Self::NotAcceptable(body)
            | Self::Conflict(body)
            | Self::PreconditionFailed(body)
            | Self::RequestEntityTooLarge(body)
            | Self::UnsupportedMediaType(body)
            | Self::RequestRangeNotSatisfiable(body)
            | Self::ExpectationFailed(body)
            | Self::InternalServer(body)
            | Self::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    /// True for errors the server answered with an HTTP status
    pub fn is_server_error(&self) -> bool {
        self.body().is_some()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type for CouchDB operations
pub type Result<T> = std::result::Result<T, ClientError>;
