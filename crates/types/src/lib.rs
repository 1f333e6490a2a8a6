//! Shared type definitions for Anvil Console.
//!
//! Descriptors describe what can be invoked, invocation types describe a
//! single call in flight, and the error module holds the closed failure
//! taxonomy every layer reports through.

pub mod descriptor;
pub mod error;
pub mod invocation;

pub use descriptor::{Category, MethodDescriptor, MethodSummary, ParameterSpec, ParameterType};
pub use error::{ClassifiedError, ErrorKind, InternalError, RpcError, SendError, TransportError, ValidationError};
pub use invocation::{
    ARTIFACT_MIME_TYPE, Artifact, InvocationId, InvocationRequest, InvocationState, Materialized, Outcome, RawValue, RpcResult,
    SlotKey,
};
