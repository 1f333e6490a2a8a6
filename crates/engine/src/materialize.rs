//! Result materialization for download-flagged methods.

use anvil_console_types::{ARTIFACT_MIME_TYPE, Artifact, InternalError, Materialized, MethodDescriptor, RpcResult};

/// Turn a successful result into an [`Artifact`] or pass it through.
///
/// Artifacts are named `<method_name>.json` and contain the result exactly as
/// the node sent it: spacing, escapes, key order and numeric text included.
pub fn materialize(descriptor: &MethodDescriptor, result: RpcResult) -> Result<Materialized, InternalError> {
    if descriptor.produces_downloadable {
        return Ok(Materialized::Artifact(Artifact {
            suggested_filename: artifact_filename(&descriptor.method_name),
            mime_type: ARTIFACT_MIME_TYPE.to_string(),
            bytes: result.as_str().as_bytes().to_vec(),
        }));
    }
    let value = result
        .to_value()
        .map_err(|error| InternalError::new(format!("result for {} could not be decoded: {error}", descriptor.method_name)))?;
    Ok(Materialized::PassThrough(value))
}

/// Deterministic file name for a method's artifact.
pub fn artifact_filename(method_name: &str) -> String {
    let stem: String = method_name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' { ch } else { '_' })
        .collect();
    format!("{stem}.json")
}
