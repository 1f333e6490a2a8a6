//! Request building: raw form values to a positional [`InvocationRequest`].

use std::sync::Arc;

use anvil_console_types::{InvocationRequest, MethodDescriptor, RawValue, ValidationError};
use indexmap::IndexMap;
use tracing::debug;

use crate::coerce::coerce;

/// Build a request for `descriptor` from raw values keyed by parameter name.
///
/// Parameters are coerced in declared order and the first failure is
/// returned; partial results are never exposed. Raw values for names the
/// descriptor does not declare are ignored.
pub fn build_request(
    descriptor: &Arc<MethodDescriptor>,
    raw_values: &IndexMap<String, RawValue>,
) -> Result<InvocationRequest, ValidationError> {
    let coerced_arguments = descriptor
        .parameters
        .iter()
        .map(|parameter| {
            let raw = raw_values
                .get(&parameter.name)
                .ok_or_else(|| ValidationError::MissingParameter(parameter.name.clone()))?;
            coerce(parameter, raw)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ignored: Vec<&str> = raw_values
        .keys()
        .filter(|key| descriptor.parameter(key).is_none())
        .map(String::as_str)
        .collect();
    if !ignored.is_empty() {
        debug!(method = %descriptor.method_name, ?ignored, "ignoring undeclared raw values");
    }

    Ok(InvocationRequest {
        descriptor: Arc::clone(descriptor),
        coerced_arguments,
    })
}
