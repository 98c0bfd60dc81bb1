//! Error types for the Nyayasathi client.
//!
//! Repository failures keep the backend taxonomy. Everything above the
//! transport wraps them in [`NyayaError`].

use thiserror::Error;

use crate::models::ComplaintId;

/// Generic message shown when the backend gave nothing better.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Failure of a call against the remote complaint store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Credential missing or rejected by the backend.
    #[error("Unauthorized: credential missing or rejected")]
    Unauthorized,

    /// The complaint does not exist (e.g. deleted by someone else).
    #[error("Complaint not found")]
    NotFound,

    /// Transport failure. Retried only by the user, never automatically.
    #[error("Network error: {0}")]
    Network(String),

    /// The response did not decode into the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Business error reported by the backend, e.g. a duplicate complaint.
    #[error("{0}")]
    DomainRejected(String),
}

impl RepositoryError {
    /// Message to show the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            Self::NotFound => "Complaint not found. It may have been removed.".to_string(),
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Malformed(_) => "Unexpected response from the server.".to_string(),
            Self::DomainRejected(message) if message.trim().is_empty() => {
                NETWORK_ERROR_MESSAGE.to_string()
            }
            Self::DomainRejected(message) => message.clone(),
        }
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Central error type for all client operations.
#[derive(Debug, Error)]
pub enum NyayaError {
    /// A backend call failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// No usable session; the caller must authenticate first.
    #[error("Not logged in")]
    SessionMissing,

    /// The current principal may not perform this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested status change is not offered from the current status.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The backend accepted a change but reloading the complaint list failed.
    #[error("{change}, but refreshing the complaint list failed: {source}")]
    RefreshAfterChange {
        change: String,
        source: Box<NyayaError>,
    },

    /// Local input validation failed before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// Configuration error (invalid values, unusable paths).
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NyayaError {
    /// Log error with full context using tracing.
    pub fn log_with_context(&self, context: &ErrorContext) {
        match self {
            Self::Repository(RepositoryError::Unauthorized) | Self::SessionMissing => {
                tracing::warn!(
                    error = %self,
                    request_id = %context.request_id,
                    principal_id = ?context.principal_id,
                    operation = %context.operation,
                    "Authentication required"
                );
            }
            Self::Repository(_) => {
                tracing::error!(
                    error = %self,
                    request_id = %context.request_id,
                    principal_id = ?context.principal_id,
                    complaint_id = ?context.complaint_id,
                    operation = %context.operation,
                    "Backend call failed"
                );
            }
            // Rejected locally, nothing reached the backend
            Self::Forbidden(_) | Self::InvalidTransition(_) | Self::Validation(_) => {
                tracing::warn!(
                    error = %self,
                    request_id = %context.request_id,
                    principal_id = ?context.principal_id,
                    complaint_id = ?context.complaint_id,
                    operation = %context.operation,
                    "Action rejected"
                );
            }
            Self::RefreshAfterChange { source, .. } => {
                tracing::warn!(
                    error = %self,
                    request_id = %context.request_id,
                    complaint_id = ?context.complaint_id,
                    operation = %context.operation,
                    "Change accepted, list is stale"
                );
                if source.requires_reauthentication() {
                    source.log_with_context(context);
                }
            }
            Self::Config(_) | Self::Io(_) | Self::Json(_) => {
                tracing::error!(
                    error = %self,
                    request_id = %context.request_id,
                    operation = %context.operation,
                    "Local client error"
                );
            }
        }
    }

    /// Whether the caller must send the user back to authentication.
    pub fn requires_reauthentication(&self) -> bool {
        match self {
            Self::SessionMissing | Self::Repository(RepositoryError::Unauthorized) => true,
            Self::RefreshAfterChange { source, .. } => source.requires_reauthentication(),
            _ => false,
        }
    }

    /// Get user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Repository(err) => err.user_message(),
            Self::SessionMissing => "Please log in to continue.".to_string(),
            Self::Forbidden(reason) => format!("Not allowed: {}", reason),
            Self::InvalidTransition(reason) => reason.clone(),
            Self::Validation(reason) => reason.clone(),
            Self::RefreshAfterChange { change, source } => format!(
                "{}, but the complaint list could not be refreshed: {}",
                change,
                source.user_message()
            ),
            Self::Config(_) => "Client configuration error".to_string(),
            Self::Io(_) => "File system error".to_string(),
            Self::Json(_) => "Data format error".to_string(),
        }
    }
}

impl From<std::io::Error> for NyayaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Context information for error logging.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Unique request identifier for correlation
    pub request_id: String,
    /// Principal performing the action, if known
    pub principal_id: Option<u64>,
    /// Complaint the action targets, if any
    pub complaint_id: Option<ComplaintId>,
    /// Operation being performed
    pub operation: String,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            principal_id: None,
            complaint_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_principal_id(mut self, principal_id: u64) -> Self {
        self.principal_id = Some(principal_id);
        self
    }

    pub fn with_complaint_id(mut self, complaint_id: ComplaintId) -> Self {
        self.complaint_id = Some(complaint_id);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, NyayaError>;
