//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment: programmatic defaults, project
//! YAML files, then IDEAFLOW_* environment overrides, validated after load.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
