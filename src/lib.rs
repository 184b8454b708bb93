//! Ideaflow - adaptive idea-presentation experiment platform
//!
//! Researchers define experiments composed of groups of textual ideas;
//! logged-in participants step through a sequence of stimuli, reacting to
//! each one. The platform adaptively decides, via an "expansion rate"
//! probability, whether to show an idea from a fixation pool or an
//! expansion pool, and nudges that probability after every reaction.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure business logic and domain models
//! - **Service Layer** (`services`): Selection engine, participation state
//!   machine, administration
//! - **Adapters** (`adapters`): SQLite persistence and the HTTP portal
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading
//! - **CLI Layer** (`cli`): Command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, DatabaseConfig, Experiment, ExperimentGroup, GroupRole, Idea, IdeasGroup,
    LoggingConfig, Participation, Reaction, ResponseEntry, ServerConfig,
};
pub use domain::ports::{
    CatalogRepository, ExperimentFilter, ExperimentRepository, Identity, IdentityProvider,
    ParticipationRepository, PoolMember, RngSampler, Sampler,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CatalogService, ExperimentService, ParticipationService, StepOutcome};
