//! In-memory method search.
//!
//! Queries are split into lowercase tokens; a descriptor matches when every
//! token occurs in its method name, display name, or description. Results
//! keep declaration order so listings stay stable.

use std::sync::Arc;

use anvil_console_types::MethodDescriptor;

use crate::MethodRegistry;

impl MethodRegistry {
    /// Returns descriptors matching all tokens of `query`. An empty query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Arc<MethodDescriptor>> {
        let tokens = tokenize_query(query);
        if tokens.is_empty() {
            return Vec::new();
        }
        self.all()
            .iter()
            .filter(|descriptor| {
                let haystack = build_haystack(descriptor);
                tokens.iter().all(|token| haystack.contains(token.as_str()))
            })
            .collect()
    }
}

fn tokenize_query(query: &str) -> Vec<String> {
    query
        .split(|ch: char| ch.is_whitespace() || ch == ':')
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn build_haystack(descriptor: &MethodDescriptor) -> String {
    format!(
        "{} {} {}",
        descriptor.method_name, descriptor.display_name, descriptor.description
    )
    .to_ascii_lowercase()
}
