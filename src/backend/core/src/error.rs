//! Error handling for the job board core.
//!
//! One structured error type crosses the API boundary:
//! - machine-readable [`ErrorCode`] with a stable HTTP status mapping
//! - user-facing message kept separate from the internal message
//! - `tracing` logging with severity-appropriate levels
//! - `metrics` counter incremented on construction
//! - translation from storage errors (unique-constraint violations on the
//!   application table surface as `already_applied`, not a 500)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::lifecycle::LifecycleError;
use crate::policy::DenyReason;

/// A specialized Result type for job board operations.
pub type Result<T> = std::result::Result<T, BoardError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// These are stable; clients branch on them programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Policy denials
    Unauthenticated,
    ForbiddenRole,
    NotOwner,
    UnsupportedAction,

    // Invariant violations
    AlreadyApplied,
    JobNotOpen,
    AlreadyWithdrawn,
    InvalidTransition,
    ValidationError,

    // Records
    RecordNotFound,
    DuplicateRecord,

    // Auth plumbing
    InvalidCredentials,
    InvalidToken,
    TokenExpired,

    // Infrastructure
    DatabaseError,
    SerializationError,
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    /// Map the code to its HTTP status.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired => StatusCode::UNAUTHORIZED,

            Self::ForbiddenRole | Self::NotOwner | Self::UnsupportedAction => {
                StatusCode::FORBIDDEN
            }

            Self::AlreadyApplied
            | Self::JobNotOpen
            | Self::AlreadyWithdrawn
            | Self::InvalidTransition
            | Self::ValidationError => StatusCode::BAD_REQUEST,

            Self::RecordNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateRecord => StatusCode::CONFLICT,

            Self::DatabaseError
            | Self::SerializationError
            | Self::ConfigurationError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Coarse category label used in metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unauthenticated
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired => "auth",
            Self::ForbiddenRole | Self::NotOwner | Self::UnsupportedAction => "policy",
            Self::AlreadyApplied
            | Self::JobNotOpen
            | Self::AlreadyWithdrawn
            | Self::InvalidTransition
            | Self::ValidationError => "invariant",
            Self::RecordNotFound | Self::DuplicateRecord => "record",
            Self::DatabaseError
            | Self::SerializationError
            | Self::ConfigurationError
            | Self::InternalError => "infra",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for the job board core.
#[derive(Error, Debug)]
pub struct BoardError {
    /// Machine-readable error code.
    code: ErrorCode,

    /// User-friendly message, safe to expose to clients.
    user_message: Cow<'static, str>,

    /// Detailed internal message, for logs only.
    internal_message: Option<String>,

    /// Stable reason code carried alongside the message (policy denial
    /// reasons, invariant kinds).
    reason: Option<&'static str>,

    /// The source error that caused this error.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl BoardError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let err = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            reason: None,
            source: None,
        };
        err.record_metrics();
        err
    }

    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(code, user_message);
        err.internal_message = Some(internal_message.into());
        err
    }

    /// Internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An internal error occurred",
            message,
        )
    }

    /// Not found (404). Also used when visibility rules hide a resource,
    /// so "absent" and "hidden" are indistinguishable to the client.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::RecordNotFound, format!("{} not found: {}", entity, id))
    }

    /// Validation error (400).
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// A policy denial, mapped from the engine's reason code.
    pub fn denied(reason: DenyReason) -> Self {
        let (code, message) = match reason {
            DenyReason::Unauthenticated => (
                ErrorCode::Unauthenticated,
                "Authentication is required for this action",
            ),
            DenyReason::ForbiddenRole => (
                ErrorCode::ForbiddenRole,
                "Your role does not permit this action",
            ),
            DenyReason::NotOwner => (ErrorCode::NotOwner, "You do not own this resource"),
            DenyReason::NotVisible => {
                return Self::new(ErrorCode::RecordNotFound, "Resource not found")
                    .with_reason(reason.as_str());
            }
            DenyReason::JobNotOpen => (
                ErrorCode::JobNotOpen,
                "This job is not accepting applications",
            ),
            DenyReason::AlreadyApplied => (
                ErrorCode::AlreadyApplied,
                "You have already applied to this job",
            ),
            DenyReason::UnsupportedAction => (
                ErrorCode::UnsupportedAction,
                "This action is not supported for this resource",
            ),
        };
        Self::new(code, message).with_reason(reason.as_str())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder methods
    // ─────────────────────────────────────────────────────────────────────────

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn reason(&self) -> Option<&'static str> {
        self.reason
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging & metrics
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error at a level matching its weight. Client-caused
    /// errors stay at debug; infrastructure failures are errors.
    pub fn log(&self) {
        let code = self.code.to_string();
        let status = self.http_status().as_u16();
        if self.http_status().is_server_error() {
            error!(
                error_code = %code,
                http_status = status,
                user_message = %self.user_message,
                internal_message = ?self.internal_message,
                source = ?self.source,
                "Request failed"
            );
        } else if self.http_status() == StatusCode::CONFLICT {
            warn!(
                error_code = %code,
                http_status = status,
                user_message = %self.user_message,
                "Request rejected"
            );
        } else {
            debug!(
                error_code = %code,
                http_status = status,
                user_message = %self.user_message,
                "Request rejected"
            );
        }
    }

    fn record_metrics(&self) {
        counter!(
            "jobboard_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error envelope for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&BoardError> for ErrorResponse {
    fn from(error: &BoardError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                message: error.user_message.to_string(),
                reason: error.reason.map(str::to_string),
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.http_status();
        let response = ErrorResponse::from(&self);
        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════════════

impl From<LifecycleError> for BoardError {
    fn from(error: LifecycleError) -> Self {
        match error {
            LifecycleError::AlreadyWithdrawn => Self::new(
                ErrorCode::AlreadyWithdrawn,
                "This application has been withdrawn",
            )
            .with_reason("already_withdrawn"),
            LifecycleError::InvalidTransition { from, to } => Self::new(
                ErrorCode::InvalidTransition,
                format!("Cannot move application from {} to {}", from, to),
            )
            .with_reason("invalid_transition"),
        }
    }
}

impl From<sqlx::Error> for BoardError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => (
                ErrorCode::RecordNotFound,
                "The requested record was not found",
            ),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    // The duplicate-application race is settled here: a
                    // concurrent insert that loses to the unique index is
                    // a client-level 400, not a server error.
                    if constraint.contains("applications_job_id_applicant_id") {
                        return Self::new(
                            ErrorCode::AlreadyApplied,
                            "You have already applied to this job",
                        )
                        .with_reason("already_applied")
                        .with_source(error);
                    }
                    return Self::with_internal(
                        ErrorCode::DuplicateRecord,
                        "A record with this identifier already exists",
                        format!("Constraint violation: {}", constraint),
                    )
                    .with_source(error);
                }
                (ErrorCode::DatabaseError, "A database error occurred")
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => (
                ErrorCode::DatabaseError,
                "Unable to connect to the database",
            ),
            _ => (ErrorCode::DatabaseError, "A database error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::SerializationError,
            "Failed to serialize data",
            error.to_string(),
        )
        .with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
