pub mod catalog;
pub mod config;
pub mod experiment;
pub mod participation;

pub use catalog::{Idea, IdeasGroup};
pub use config::{Config, DatabaseConfig, LoggingConfig, ServerConfig};
pub use experiment::{Experiment, ExperimentGroup, GroupRole};
pub use participation::{Participation, Reaction, ResponseEntry};
