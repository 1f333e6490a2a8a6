use std::sync::Arc;

use anvil_console_types::{Category, MethodDescriptor};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

/// Catalog of Anvil JSON-RPC methods compiled into the binary.
const EMBEDDED_CATALOG: &str = include_str!("../catalog/anvil_methods.json");

/// Errors raised while building or querying a [`MethodRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("method '{0}' not found")]
    NotFound(String),
    #[error("duplicate method '{0}' in catalog")]
    DuplicateMethod(String),
    #[error("catalog entry {0} has an empty method name")]
    EmptyMethodName(usize),
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable, ordered table of method descriptors keyed by method name.
///
/// Iteration order equals declaration order. The registry has no mutating
/// operations; share it behind an `Arc` handle.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    descriptors: Vec<Arc<MethodDescriptor>>,
    index: IndexMap<String, usize>,
}

impl MethodRegistry {
    /// Creates the registry from the catalog embedded at build time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use anvil_console_registry::MethodRegistry;
    ///
    /// let registry = MethodRegistry::from_embedded_catalog().expect("load embedded catalog");
    /// assert!(registry.lookup("anvil_mine").is_ok());
    /// ```
    pub fn from_embedded_catalog() -> Result<Self, RegistryError> {
        Self::from_json_str(EMBEDDED_CATALOG)
    }

    /// Parses a JSON array of descriptors.
    pub fn from_json_str(catalog: &str) -> Result<Self, RegistryError> {
        let descriptors: Vec<MethodDescriptor> = serde_json::from_str(catalog)?;
        Self::from_descriptors(descriptors)
    }

    /// Builds a registry from descriptors, enforcing unique, non-empty method names.
    pub fn from_descriptors(descriptors: Vec<MethodDescriptor>) -> Result<Self, RegistryError> {
        let mut index = IndexMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            if descriptor.method_name.trim().is_empty() {
                return Err(RegistryError::EmptyMethodName(position));
            }
            if index.insert(descriptor.method_name.clone(), position).is_some() {
                return Err(RegistryError::DuplicateMethod(descriptor.method_name.clone()));
            }
        }
        debug!(method_count = descriptors.len(), "method registry loaded");
        Ok(Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    /// Finds a descriptor by its wire name.
    pub fn lookup(&self, method_name: &str) -> Result<&Arc<MethodDescriptor>, RegistryError> {
        self.index
            .get(method_name)
            .map(|&position| &self.descriptors[position])
            .ok_or_else(|| RegistryError::NotFound(method_name.to_string()))
    }

    /// All descriptors in declaration order.
    pub fn all(&self) -> &[Arc<MethodDescriptor>] {
        &self.descriptors
    }

    /// Descriptors in `category`, in declaration order.
    pub fn list_by_category(&self, category: &Category) -> Vec<&Arc<MethodDescriptor>> {
        self.descriptors
            .iter()
            .filter(|descriptor| &descriptor.category == category)
            .collect()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = Vec::new();
        for descriptor in &self.descriptors {
            if !categories.contains(&descriptor.category) {
                categories.push(descriptor.category.clone());
            }
        }
        categories
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
