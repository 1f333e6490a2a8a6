//! Failure classification.
//!
//! Every failure that can end an invocation is funnelled through
//! [`classify`], which maps it onto exactly one [`ClassifiedError`] kind.

use anvil_console_types::{ClassifiedError, InternalError, SendError, ValidationError};
use tracing::error;

/// Any failure that can reach the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    Validation(ValidationError),
    Send(SendError),
    Internal(InternalError),
}

impl From<ValidationError> for Failure {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}

impl From<SendError> for Failure {
    fn from(error: SendError) -> Self {
        Self::Send(error)
    }
}

impl From<InternalError> for Failure {
    fn from(error: InternalError) -> Self {
        Self::Internal(error)
    }
}

/// Map a failure onto its single classified kind.
///
/// Internal errors are also logged as defects.
pub fn classify(failure: impl Into<Failure>) -> ClassifiedError {
    match failure.into() {
        Failure::Validation(error) => ClassifiedError::Validation(error),
        Failure::Send(SendError::Transport(error)) => ClassifiedError::Transport(error),
        Failure::Send(SendError::Rpc(error)) => ClassifiedError::Rpc(error),
        Failure::Internal(internal) => {
            error!(invariant = %internal.invariant_violated, "invocation engine defect");
            ClassifiedError::Internal(internal)
        }
    }
}
