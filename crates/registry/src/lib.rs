//! Registry crate for the Anvil JSON-RPC method catalog.
//!
//! The catalog is embedded at compile time and exposed as an immutable
//! [`MethodRegistry`]. The crate also turns the registry into a categorized
//! Clap command tree for the command-line front end.

pub mod clap_builder;
pub mod models;
pub mod search;

pub use anvil_console_types::{Category, MethodDescriptor, ParameterSpec, ParameterType};
pub use clap_builder::{build_clap, raw_values_from_matches};
pub use models::{MethodRegistry, RegistryError};
