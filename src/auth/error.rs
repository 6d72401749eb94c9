//! Authentication error types.
//!
//! Every expected rejection is a value of [`AuthErrorCode`]; none of the
//! codes or default messages carry key or signature material.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Authentication error codes (4101-4108).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AuthErrorCode {
    /// 4101: One or more credential headers missing or unreadable
    MissingHeaders = 4101,
    /// 4102: Public key is not 64 hex characters / 32 bytes
    InvalidPublicKey = 4102,
    /// 4103: Timestamp outside the allowed drift window
    TimestampExpired = 4103,
    /// 4104: (public key, nonce) pair already consumed
    NonceReused = 4104,
    /// 4105: Signature verification failed
    InvalidSignature = 4105,
    /// 4106: Route requires an admin key
    NotAdmin = 4106,
    /// 4107: Identity lacks a required permission
    InsufficientPermission = 4107,
    /// 4108: Unexpected internal fault
    InternalError = 4108,
}

impl AuthErrorCode {
    pub const ALL: [AuthErrorCode; 8] = [
        Self::MissingHeaders,
        Self::InvalidPublicKey,
        Self::TimestampExpired,
        Self::NonceReused,
        Self::InvalidSignature,
        Self::NotAdmin,
        Self::InsufficientPermission,
        Self::InternalError,
    ];

    /// Get error code as i32.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Get error name string.
    pub fn name(self) -> &'static str {
        match self {
            Self::MissingHeaders => "missing_headers",
            Self::InvalidPublicKey => "invalid_public_key",
            Self::TimestampExpired => "timestamp_expired",
            Self::NonceReused => "nonce_reused",
            Self::InvalidSignature => "invalid_signature",
            Self::NotAdmin => "not_admin",
            Self::InsufficientPermission => "insufficient_permission",
            Self::InternalError => "internal_error",
        }
    }

    /// Position in [`AuthErrorCode::ALL`], used for counter arrays.
    pub fn index(self) -> usize {
        (self.code() - Self::MissingHeaders.code()) as usize
    }

    /// Get HTTP status code.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::NotAdmin | Self::InsufficientPermission => StatusCode::FORBIDDEN,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether a client may retry the same request unchanged.
    ///
    /// A reused nonce is never retryable: the client must mint a fresh one.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::InternalError)
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Authentication error with message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
}

impl AuthError {
    /// Create a new auth error.
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create error with default message.
    pub fn from_code(code: AuthErrorCode) -> Self {
        let message = match code {
            AuthErrorCode::MissingHeaders => "Missing authentication headers",
            AuthErrorCode::InvalidPublicKey => "Public key must be 64 hex characters",
            AuthErrorCode::TimestampExpired => "Timestamp too far from server time",
            AuthErrorCode::NonceReused => "Nonce already used, generate a fresh one",
            AuthErrorCode::InvalidSignature => "Signature verification failed",
            AuthErrorCode::NotAdmin => "Admin access required",
            AuthErrorCode::InsufficientPermission => {
                "Insufficient permissions for this operation"
            }
            AuthErrorCode::InternalError => "Internal server error",
        };
        Self::new(code, message)
    }
}

impl From<AuthErrorCode> for AuthError {
    fn from(code: AuthErrorCode) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AuthError {}

/// JSON response body for auth errors.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub code: i32,
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = AuthErrorResponse {
            code: self.code.code(),
            error: self.code.name(),
            message: self.message,
        };
        (self.code.http_status(), Json(body)).into_response()
    }
}
