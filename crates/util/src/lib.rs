pub mod config;
pub mod text_processing;

pub use config::{ConfigError, ConsoleConfig, expand_tilde};
pub use text_processing::{redact_json, redact_sensitive, truncate_for_summary};
