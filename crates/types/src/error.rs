//! Closed failure taxonomy shared by the engine, transports, and UIs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Caller-input problem detected before anything is sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// A declared parameter had no raw value.
    #[error("missing value for parameter '{0}'")]
    MissingParameter(String),
    /// Text for a `number` parameter is not an unsigned integer.
    #[error("parameter '{name}' expects an unsigned integer, got '{raw}'")]
    NotANumber { name: String, raw: String },
    /// The raw value has the wrong shape for the declared type (text for a
    /// boolean, a boolean for a string, ...).
    #[error("parameter '{name}' expects a {expected} value")]
    TypeMismatch { name: String, expected: String },
    /// Text for a `string[]` parameter is not a list of `0x` hex strings.
    #[error("parameter '{name}' expects a list of 0x-prefixed hex strings, got '{raw}'")]
    InvalidHexList { name: String, raw: String },
    /// The descriptor declares a type the engine cannot coerce.
    #[error("parameter '{name}' has unsupported type '{declared}'")]
    UnsupportedType { name: String, declared: String },
}

impl ValidationError {
    /// Name of the parameter the failure belongs to.
    pub fn parameter_name(&self) -> &str {
        match self {
            Self::MissingParameter(name) => name,
            Self::NotANumber { name, .. }
            | Self::TypeMismatch { name, .. }
            | Self::InvalidHexList { name, .. }
            | Self::UnsupportedType { name, .. } => name,
        }
    }
}

/// No response could be obtained from the node.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransportError {
    #[error("node unreachable: {0}")]
    Unreachable(String),
    #[error("request timed out")]
    Timeout,
    /// Something answered, but not with a usable JSON-RPC response.
    #[error("invalid response from node: {0}")]
    InvalidResponse(String),
}

/// Structured JSON-RPC error object returned by the node.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An invariant inside the engine was violated. Always a defect.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("internal error: {invariant_violated}")]
pub struct InternalError {
    pub invariant_violated: String,
}

impl InternalError {
    pub fn new(invariant_violated: impl Into<String>) -> Self {
        Self {
            invariant_violated: invariant_violated.into(),
        }
    }
}

/// Failure reported by a transport's `send`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SendError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// The single kind a classified failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Transport,
    Rpc,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::Rpc => "rpc",
            Self::Internal => "internal",
        })
    }
}

/// A failure after classification: exactly one of the four kinds.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ClassifiedError {
    #[error(transparent)]
    Validation(ValidationError),
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Rpc(RpcError),
    #[error(transparent)]
    Internal(InternalError),
}

impl ClassifiedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Rpc(_) => ErrorKind::Rpc,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Parameter name for field-level messages; only validation failures have one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation(error) => Some(error.parameter_name()),
            _ => None,
        }
    }

    /// Internal errors indicate a bug rather than a user-facing condition.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
