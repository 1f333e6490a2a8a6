//! Runtime invocation types: raw form input, built requests, states and outcomes.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::value::{RawValue as RawJson, to_raw_value};
use serde_json::{Value, json};

use crate::{ClassifiedError, MethodDescriptor};

/// Mime type of every artifact produced by the engine.
pub const ARTIFACT_MIME_TYPE: &str = "application/json";

/// A raw field value as delivered by a form: text input or checkbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Text(String),
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for RawValue {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

/// Session-unique identifier of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvocationId(pub u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of the UI form an invocation was issued from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey(pub String);

impl From<&str> for SlotKey {
    fn from(slot: &str) -> Self {
        Self(slot.to_string())
    }
}

impl From<String> for SlotKey {
    fn from(slot: String) -> Self {
        Self(slot)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationState {
    /// Raw values are being coerced and the request assembled.
    Building,
    /// The request was handed to the transport and is awaiting a result.
    Dispatched,
    /// Terminal: the node returned a result.
    Succeeded,
    /// Terminal: validation, transport, RPC or internal failure.
    Failed,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// A validated request ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub descriptor: Arc<MethodDescriptor>,
    /// One value per declared parameter, in declared order.
    pub coerced_arguments: Vec<Value>,
}

impl InvocationRequest {
    pub fn method_name(&self) -> &str {
        &self.descriptor.method_name
    }

    /// JSON-RPC 2.0 request object for this request.
    pub fn to_envelope(&self, id: u64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": self.descriptor.method_name,
            "params": self.coerced_arguments,
        })
    }
}

/// The `result` member of a JSON-RPC response, kept as the exact text the
/// node sent.
#[derive(Debug, Clone)]
pub struct RpcResult(Box<RawJson>);

impl RpcResult {
    pub fn from_raw(raw: Box<RawJson>) -> Self {
        Self(raw)
    }

    /// Wrap `text`, which must be a single JSON value.
    pub fn from_text(text: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawJson::from_string(text.into()).map(Self)
    }

    /// Compact serialization of `value`.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        to_raw_value(value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(self.0.get())
    }
}

impl PartialEq for RpcResult {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A downloadable file produced from a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub suggested_filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// What a successful result turns into for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// The descriptor is download-flagged.
    Artifact(Artifact),
    /// Shown directly.
    PassThrough(Value),
}

/// Terminal outcome of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Materialized),
    Failure(ClassifiedError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Failure(error) => Some(error),
            Self::Success(_) => None,
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Success(Materialized::Artifact(artifact)) => Some(artifact),
            _ => None,
        }
    }
}
