//! Parameter coercion.
//!
//! Converts a raw form value into the JSON shape a parameter's declared type
//! requires. Coercion is pure: the same input always yields the same output.
//!
//! Numeric grammar: surrounding whitespace is ignored, then either decimal
//! digits or `0x`/`0X` followed by hex digits. Signs, fractions, exponents
//! and digit separators are rejected. Values are parsed as 256-bit unsigned
//! integers; those up to 2^53 - 1 are emitted as JSON numbers and larger
//! ones as minimal `0x` hex quantities, so nothing is ever rounded.

use alloy_primitives::U256;
use anvil_console_types::{ParameterSpec, ParameterType, RawValue, ValidationError};
use serde_json::Value;

/// Largest integer a JSON number can carry without precision loss in common clients.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Coerce `raw` against `spec`.
///
/// # Errors
///
/// - [`ValidationError::TypeMismatch`] when a checkbox value is given for a
///   text parameter or text for a boolean parameter
/// - [`ValidationError::NotANumber`] for malformed numeric text
/// - [`ValidationError::InvalidHexList`] for malformed `string[]` text
/// - [`ValidationError::UnsupportedType`] for unknown declared types
pub fn coerce(spec: &ParameterSpec, raw: &RawValue) -> Result<Value, ValidationError> {
    match (&spec.declared_type, raw) {
        (ParameterType::Unsupported(declared), _) => Err(ValidationError::UnsupportedType {
            name: spec.name.clone(),
            declared: declared.clone(),
        }),
        (ParameterType::String, RawValue::Text(text)) => Ok(Value::String(text.clone())),
        (ParameterType::Boolean, RawValue::Bool(flag)) => Ok(Value::Bool(*flag)),
        (ParameterType::Number, RawValue::Text(text)) => parse_unsigned(text)
            .map(quantity_to_json)
            .ok_or_else(|| ValidationError::NotANumber {
                name: spec.name.clone(),
                raw: text.clone(),
            }),
        (ParameterType::HexStringList, RawValue::Text(text)) => parse_hex_list(text)
            .map(|entries| Value::Array(entries.into_iter().map(Value::String).collect()))
            .ok_or_else(|| ValidationError::InvalidHexList {
                name: spec.name.clone(),
                raw: text.clone(),
            }),
        (declared, _) => Err(ValidationError::TypeMismatch {
            name: spec.name.clone(),
            expected: declared.to_string(),
        }),
    }
}

/// Parse decimal or `0x` hex text into a 256-bit unsigned integer.
pub fn parse_unsigned(text: &str) -> Option<U256> {
    let trimmed = text.trim();
    match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(digits) => {
            if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
                return None;
            }
            U256::from_str_radix(digits, 16).ok()
        }
        None => {
            if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
                return None;
            }
            U256::from_str_radix(trimmed, 10).ok()
        }
    }
}

fn quantity_to_json(value: U256) -> Value {
    match u64::try_from(value) {
        Ok(small) if small <= MAX_SAFE_INTEGER => Value::from(small),
        _ => Value::String(format!("{value:#x}")),
    }
}

/// Accepts a JSON array of strings or a comma/whitespace separated list.
fn parse_hex_list(text: &str) -> Option<Vec<String>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    let entries: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).ok()?
    } else {
        trimmed
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    };
    entries.iter().all(|entry| is_hex_string(entry)).then_some(entries)
}

fn is_hex_string(entry: &str) -> bool {
    entry
        .strip_prefix("0x")
        .is_some_and(|digits| digits.bytes().all(|byte| byte.is_ascii_hexdigit()))
}
