//! Unified error type definition

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use console_api::{ApiError, ErrorClass};

/// Field name → message, in field order.
pub type FieldErrors = BTreeMap<String, String>;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Local form validation failed; never reaches the network
    #[error("Validation failed: {}", summarize(.0))]
    ValidationFailed(FieldErrors),

    /// The viewer's permissions do not grant the policy
    #[error("Permission denied: {0}")]
    PolicyDenied(String),

    /// The action's allowed predicate rejected the target
    #[error("Action not allowed: {0}")]
    ActionNotAllowed(String),

    /// Two actions in one resolved set share an id
    #[error("Duplicate action id: {0}")]
    DuplicateActionId(String),

    /// A later request for the same slot was issued; this response was dropped
    #[error("Response superseded by a newer request")]
    Superseded,

    /// The controller was unmounted while the request was in flight
    #[error("Controller unmounted")]
    Unmounted,

    /// Route key or parameter missing from the routing table
    #[error("Route error: {0}")]
    RouteError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Remote API error
    #[error("{0}")]
    Api(#[from] ApiError),
}

/// How an error propagates to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Shown inline next to the offending field.
    ValidationFailed,
    /// 4xx-equivalent refusal (not found, forbidden, conflict, ...).
    RequestRejected,
    /// Network, timeout or unusable response.
    TransportFailure,
    /// Misconfiguration or a request that was deliberately dropped.
    Internal,
}

impl CoreError {
    /// Whether it is expected behavior (user input, stale responses, missing
    /// permissions, ...), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ValidationFailed(_)
            | Self::PolicyDenied(_)
            | Self::ActionNotAllowed(_)
            | Self::Superseded
            | Self::Unmounted => true,
            Self::Api(e) => e.is_expected(),
            _ => false,
        }
    }

    /// Propagation class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::PolicyDenied(_) | Self::ActionNotAllowed(_) => ErrorKind::RequestRejected,
            Self::Api(e) => match e.class() {
                ErrorClass::Rejected => ErrorKind::RequestRejected,
                ErrorClass::Transport => ErrorKind::TransportFailure,
            },
            Self::DuplicateActionId(_)
            | Self::Superseded
            | Self::Unmounted
            | Self::RouteError(_)
            | Self::ConfigError(_)
            | Self::SerializationError(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error only reflects a dropped stale continuation.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Superseded | Self::Unmounted)
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
