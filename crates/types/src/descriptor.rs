//! Method descriptor types consumed by the registry and the invocation engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Grouping tag for a method descriptor.
///
/// The set is open: the known tags map to dedicated variants and anything else
/// is preserved verbatim in [`Category::Other`]. Categories only drive display
/// grouping; dispatch never branches on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Node inspection and state utilities (e.g. `anvil_dumpState`).
    Utility,
    /// Chain manipulation such as mining and time travel.
    Chain,
    /// Account-level operations (balances, impersonation, transactions).
    User,
    /// Any tag not known at compile time.
    Other(String),
}

impl Category {
    /// Wire tag for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Utility => "utility",
            Self::Chain => "chain",
            Self::User => "user",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "utility" => Self::Utility,
            "chain" => Self::Chain,
            "user" => Self::User,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for Category {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a single method parameter.
///
/// Unknown tags deserialize into [`ParameterType::Unsupported`] so that a
/// catalog containing them still loads; the coercer rejects such parameters
/// per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParameterType {
    /// Free text; hex payloads are passed through untouched.
    String,
    /// A checkbox-style boolean.
    Boolean,
    /// An unsigned integer quantity of up to 256 bits.
    Number,
    /// A list of `0x`-prefixed hex strings (`string[]` in the catalog).
    HexStringList,
    /// A type tag the engine does not understand.
    Unsupported(String),
}

impl ParameterType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::HexStringList => "string[]",
            Self::Unsupported(tag) => tag.as_str(),
        }
    }
}

impl From<String> for ParameterType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "number" => Self::Number,
            "string[]" => Self::HexStringList,
            _ => Self::Unsupported(tag),
        }
    }
}

impl From<ParameterType> for String {
    fn from(parameter_type: ParameterType) -> Self {
        match parameter_type {
            ParameterType::Unsupported(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed positional parameter of a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Field name shown in forms and used as the key for raw values.
    pub name: String,
    /// Declared type driving coercion.
    #[serde(rename = "type")]
    pub declared_type: ParameterType,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, declared_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            declared_type,
        }
    }
}

/// Static description of one invocable JSON-RPC method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    /// Wire name of the RPC method (e.g. `anvil_mine`). Unique per registry.
    pub method_name: String,
    /// Human label for menus.
    #[serde(default)]
    pub display_name: String,
    /// Longer help text.
    #[serde(default)]
    pub description: String,
    /// Display grouping.
    pub category: Category,
    /// Ordered parameters; the order is the positional order on the wire.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Whether a successful result is turned into a downloadable artifact.
    #[serde(default)]
    pub produces_downloadable: bool,
}

impl MethodDescriptor {
    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    /// Short summary used in listings.
    pub fn summary(&self) -> MethodSummary {
        MethodSummary {
            method_name: self.method_name.clone(),
            display_name: self.display_name.clone(),
            category: self.category.clone(),
            parameter_names: self.parameters.iter().map(|parameter| parameter.name.clone()).collect(),
            produces_downloadable: self.produces_downloadable,
        }
    }
}

/// Lightweight projection of a descriptor for menus and `list` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSummary {
    pub method_name: String,
    pub display_name: String,
    pub category: Category,
    pub parameter_names: Vec<String>,
    pub produces_downloadable: bool,
}
