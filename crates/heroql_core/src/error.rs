//! Error taxonomy for HeroQL.
//!
//! Two families of errors exist and they travel differently:
//! - [`ConfigError`] and [`ValidationError`] are programming mistakes. They are
//!   returned synchronously and never converted into fallback values.
//! - [`ExecutionError`] describes an environmental or remote failure. The client
//!   logs it and replaces it with a fallback before it reaches the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::operation::OperationKind;

/// Typed error codes for execution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // Transport errors
    NetworkError,
    Timeout,
    ConnectionRefused,
    InvalidUrl,
    HttpError,

    // Response errors
    InvalidResponse,
    NoData,
    DeserializeError,
    SerializeError,

    // Remote errors
    ServerError,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionRefused => "CONNECTION_REFUSED",
            Self::InvalidUrl => "INVALID_URL",
            Self::HttpError => "HTTP_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::NoData => "NO_DATA",
            Self::DeserializeError => "DESERIALIZE_ERROR",
            Self::SerializeError => "SERIALIZE_ERROR",
            Self::ServerError => "SERVER_ERROR",
        }
    }

    /// Returns true if the failure happened before a well-formed GraphQL
    /// response was received.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkError
                | Self::Timeout
                | Self::ConnectionRefused
                | Self::InvalidUrl
                | Self::HttpError
        )
    }

    /// Returns true if the server answered with a non-empty `errors` list.
    pub const fn is_server(&self) -> bool {
        matches!(self, Self::ServerError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `Failed(reason)` side of an execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{code}] {message}")]
pub struct ExecutionError {
    /// Typed error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
}

impl ExecutionError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    /// Creates a timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, "Request timed out")
    }

    /// Creates an error for a non-2xx HTTP status.
    pub fn http(status: u16) -> Self {
        Self::new(ErrorCode::HttpError, format!("HTTP status {}", status))
    }

    /// Creates an error for a response that is not a GraphQL response.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    /// Creates an error from the server's `errors` list.
    pub fn server(messages: &[String]) -> Self {
        Self::new(ErrorCode::ServerError, messages.join("; "))
    }

    /// Creates a deserialization error.
    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DeserializeError, message)
    }

    /// Creates a serialization error.
    pub fn serialize(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializeError, message)
    }

    pub fn is_transport(&self) -> bool {
        self.code.is_transport()
    }

    pub fn is_server(&self) -> bool {
        self.code.is_server()
    }
}

/// Result of executing one operation.
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// A malformed operation or operation set. Raised at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid operation at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unsupported operation kind `{0}`")]
    UnsupportedKind(String),

    #[error("variable `${0}` is declared more than once")]
    DuplicateVariable(String),

    #[error("default value for `${0}` is not supported")]
    DefaultValue(String),

    #[error("`{slot}` must be a {expected} but `{operation}` is a {actual}")]
    KindMismatch {
        slot: &'static str,
        operation: String,
        expected: OperationKind,
        actual: OperationKind,
    },

    #[error("operation set is missing `{0}`")]
    MissingOperation(&'static str),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid header `{0}`")]
    InvalidHeader(String),
}

/// Variables that do not satisfy an operation's schema, or an operation used
/// through the wrong entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected a {expected} operation, got {actual} `{operation}`")]
    WrongKind {
        operation: String,
        expected: OperationKind,
        actual: OperationKind,
    },

    #[error("variables must be an object, got {0}")]
    NotAnObject(String),

    #[error("unknown variable `${0}`")]
    UnknownVariable(String),

    #[error("missing required variable `${0}`")]
    MissingVariable(String),

    #[error("variable `${name}` expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("could not serialize variables: {0}")]
    Serialize(String),
}
