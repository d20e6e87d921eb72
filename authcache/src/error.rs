//! Error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a binding configuration is rejected at registration time
///
/// Each variant names exactly one missing or invalid field so callers can
/// tell configurations apart without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty binding name")]
    EmptyName,

    #[error("empty route path")]
    EmptyPath,

    #[error("route path must start with '/': {0}")]
    RelativePath(String),

    #[error("route path must be a literal path: {0}")]
    InvalidPath(String),

    #[error("empty redirectTo path")]
    EmptyRedirectTo,

    #[error("empty oauth2 clientId")]
    EmptyClientId,

    #[error("empty oauth2 client secret")]
    EmptyClientSecret,

    #[error("empty oauth2 redirect")]
    EmptyRedirectUrl,

    #[error("empty oauth2 scopes")]
    EmptyScopes,

    #[error("empty oauth2 authorization endpoint")]
    EmptyAuthUrl,

    #[error("empty oauth2 token endpoint")]
    EmptyTokenUrl,

    #[error("invalid oauth2 URL: {0}")]
    InvalidUrl(String),

    #[error("cache TTL must be greater than zero")]
    ZeroTtl,

    #[error("cache TTL of {0}s exceeds the maximum")]
    TtlTooLong(u64),

    #[error("cache unreachable: {0}")]
    CacheUnreachable(String),
}

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Binding failed validation
    #[error("Invalid binding configuration: {0}")]
    Validation(#[from] ValidationError),

    /// Two bindings registered on the same route path
    #[error("Duplicate binding path: {0}")]
    DuplicatePath(String),

    /// Two bindings registered under the same name
    #[error("Duplicate binding name: {0}")]
    DuplicateName(String),

    /// Two bindings would share one session cookie
    #[error("Duplicate session cookie name: {0}")]
    DuplicateSessionName(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// The request carried no session cookie for the binding
    #[error("no session cookie")]
    NoSession,

    /// The session cookie holds no string session identifier
    #[error("no session id in cookie")]
    MissingIdentifier,

    /// No live token is cached for the session identifier
    #[error("no cached token for session")]
    CacheMiss,

    /// Cached token bytes could not be decoded
    #[error("malformed cached token: {0}")]
    MalformedToken(String),

    /// Lookup by a binding name that was never registered
    #[error("binding does not exist: {0}")]
    UnknownBinding(String),

    /// Session cookie could not be read or written
    #[error("Session error: {0}")]
    Session(String),

    /// Redis error
    #[error("Redis error: {0}")]
    Redis(Box<redis::RedisError>),

    /// Token cache error other than Redis command failures
    #[error("Cache error: {0}")]
    Cache(String),

    /// External service error (identity provider)
    #[error("External service error: {0}")]
    External(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status this error maps to when it reaches a response
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::NoSession | Error::MissingIdentifier => {
                StatusCode::BAD_REQUEST
            }
            Error::CacheMiss => StatusCode::UNAUTHORIZED,
            Error::External(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Error::BadRequest(msg) => msg,
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                msg
            }
            Error::NoSession | Error::MissingIdentifier | Error::CacheMiss => self.to_string(),
            Error::External(msg) => {
                tracing::error!("External service error: {}", msg);
                "external service unavailable".to_string()
            }
            Error::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                "cache operation failed".to_string()
            }
            Error::Cache(msg) => {
                tracing::error!("Cache error: {}", msg);
                "cache operation failed".to_string()
            }
            Error::Session(msg) => {
                tracing::error!("Session error: {}", msg);
                "session operation failed".to_string()
            }
            other => {
                tracing::error!("Unexpected error: {}", other);
                "internal server error".to_string()
            }
        };

        (status, body).into_response()
    }
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Redis(Box::new(err))
    }
}

/// Sanitize a connection URL by removing credentials
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos + 1..];
            return format!("{}<redacted>@{}", scheme, after_at);
        }
    }
    url.to_string()
}
