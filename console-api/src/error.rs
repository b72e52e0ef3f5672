use serde::{Deserialize, Serialize};

/// Unified error type for all remote resource operations.
///
/// Each variant carries a `resource` field naming the collection that produced
/// the error (e.g. `"projects"`), plus variant-specific context. All variants are
/// serializable so they can be handed to the rendering layer unchanged.
///
/// # Error classes
///
/// Variants fall into two classes, see [`ApiError::class`]:
/// - [`ErrorClass::Rejected`]: the server understood the request and refused it
///   (4xx-equivalent).
/// - [`ErrorClass::Transport`]: the request never produced a usable answer
///   (network, timeout, rate limit, 5xx, unparsable body).
///
/// # Retryable Errors
///
/// [`NetworkError`](Self::NetworkError), [`Timeout`](Self::Timeout) and
/// [`RateLimited`](Self::RateLimited) are retried by the built-in HTTP client
/// with exponential backoff. `POST`/`PATCH` requests only retry `RateLimited`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ApiError {
    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    NetworkError {
        /// Collection that produced the error.
        resource: String,
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Collection that produced the error.
        resource: String,
        /// Error details.
        detail: String,
    },

    /// The API rate limit has been exceeded (HTTP 429).
    RateLimited {
        /// Collection that produced the error.
        resource: String,
        /// Suggested wait time in seconds, if the server sent `Retry-After`.
        retry_after: Option<u64>,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The auth token is missing, invalid or expired (HTTP 401).
    Unauthorized {
        /// Collection that produced the error.
        resource: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The viewer lacks permission for the requested operation (HTTP 403).
    Forbidden {
        /// Collection that produced the error.
        resource: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The addressed resource does not exist (HTTP 404).
    NotFound {
        /// Collection that produced the error.
        resource: String,
        /// Identifier that was looked up, `<unknown>` for collection-level misses.
        resource_id: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The request conflicts with the current server state (HTTP 409),
    /// e.g. a duplicated name.
    Conflict {
        /// Collection that produced the error.
        resource: String,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// The server rejected the payload as invalid (HTTP 400/422).
    ValidationFailed {
        /// Collection that produced the error.
        resource: String,
        /// Server-provided description of what is wrong.
        detail: String,
    },

    /// The server failed while handling the request (HTTP 500/501 and others).
    ServerError {
        /// Collection that produced the error.
        resource: String,
        /// HTTP status code.
        status: u16,
        /// Original error message, if available.
        raw_message: Option<String>,
    },

    /// Failed to parse the server's response.
    ParseError {
        /// Collection that produced the error.
        resource: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Collection that produced the error.
        resource: String,
        /// Details about the serialization failure.
        detail: String,
    },

    /// The client configuration is unusable (bad base URL, TLS setup, etc.).
    InvalidConfig {
        /// Collection the client was being built for.
        resource: String,
        /// What is wrong with the configuration.
        detail: String,
    },

    /// An unrecognized response that maps to no other variant.
    Unknown {
        /// Collection that produced the error.
        resource: String,
        /// HTTP status code, if one was received.
        status: Option<u16>,
        /// Raw error message.
        raw_message: String,
    },
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The server refused the request (4xx-equivalent).
    Rejected,
    /// The request did not complete with a usable answer.
    Transport,
}

impl ApiError {
    /// 是否为预期行为（用户输入、资源不存在、无权限等），用于日志分级。
    ///
    /// 返回 `true` 时应使用 `warn` 级别，`false` 时使用 `error` 级别。
    /// **新增变体时请同步更新此方法。**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. }
                | Self::Forbidden { .. }
                | Self::NotFound { .. }
                | Self::Conflict { .. }
                | Self::ValidationFailed { .. }
        )
    }

    /// Whether the failure is transient and the request may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }

    /// Classify the error as a server rejection or a transport failure.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized { .. }
            | Self::Forbidden { .. }
            | Self::NotFound { .. }
            | Self::Conflict { .. }
            | Self::ValidationFailed { .. } => ErrorClass::Rejected,
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::RateLimited { .. }
            | Self::ServerError { .. }
            | Self::ParseError { .. }
            | Self::SerializationError { .. }
            | Self::InvalidConfig { .. }
            | Self::Unknown { .. } => ErrorClass::Transport,
        }
    }

    /// Name of the collection that produced the error.
    #[must_use]
    pub fn resource(&self) -> &str {
        match self {
            Self::NetworkError { resource, .. }
            | Self::Timeout { resource, .. }
            | Self::RateLimited { resource, .. }
            | Self::Unauthorized { resource, .. }
            | Self::Forbidden { resource, .. }
            | Self::NotFound { resource, .. }
            | Self::Conflict { resource, .. }
            | Self::ValidationFailed { resource, .. }
            | Self::ServerError { resource, .. }
            | Self::ParseError { resource, .. }
            | Self::SerializationError { resource, .. }
            | Self::InvalidConfig { resource, .. }
            | Self::Unknown { resource, .. } => resource,
        }
    }
}

fn write_with_message(
    f: &mut std::fmt::Formatter<'_>,
    resource: &str,
    label: &str,
    raw_message: Option<&String>,
) -> std::fmt::Result {
    match raw_message {
        Some(msg) => write!(f, "[{resource}] {label}: {msg}"),
        None => write!(f, "[{resource}] {label}"),
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { resource, detail } => {
                write!(f, "[{resource}] Network error: {detail}")
            }
            Self::Timeout { resource, detail } => {
                write!(f, "[{resource}] Request timed out: {detail}")
            }
            Self::RateLimited {
                resource,
                retry_after,
                raw_message,
            } => {
                write!(f, "[{resource}] Rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {secs}s)")?;
                }
                if let Some(msg) = raw_message {
                    write!(f, ": {msg}")?;
                }
                Ok(())
            }
            Self::Unauthorized {
                resource,
                raw_message,
            } => write_with_message(f, resource, "Unauthorized", raw_message.as_ref()),
            Self::Forbidden {
                resource,
                raw_message,
            } => write_with_message(f, resource, "Forbidden", raw_message.as_ref()),
            Self::NotFound {
                resource,
                resource_id,
                raw_message,
            } => write_with_message(
                f,
                resource,
                &format!("Not found: {resource_id}"),
                raw_message.as_ref(),
            ),
            Self::Conflict {
                resource,
                raw_message,
            } => write_with_message(f, resource, "Conflict", raw_message.as_ref()),
            Self::ValidationFailed { resource, detail } => {
                write!(f, "[{resource}] Validation failed: {detail}")
            }
            Self::ServerError {
                resource,
                status,
                raw_message,
            } => write_with_message(
                f,
                resource,
                &format!("Server error (HTTP {status})"),
                raw_message.as_ref(),
            ),
            Self::ParseError { resource, detail } => {
                write!(f, "[{resource}] Parse error: {detail}")
            }
            Self::SerializationError { resource, detail } => {
                write!(f, "[{resource}] Serialization error: {detail}")
            }
            Self::InvalidConfig { resource, detail } => {
                write!(f, "[{resource}] Invalid configuration: {detail}")
            }
            Self::Unknown {
                resource,
                raw_message,
                ..
            } => write!(f, "[{resource}] {raw_message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Result type alias for remote resource operations.
pub type Result<T> = std::result::Result<T, ApiError>;
