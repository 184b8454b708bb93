//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the trait interfaces that adapters must implement:
//! - CatalogRepository: persistence for ideas and groups
//! - ExperimentRepository: persistence for experiments and their typed group links
//! - ParticipationRepository: persistence for participations and response logs
//! - IdentityProvider: session-token identity resolution
//! - Sampler: injectable randomness for the selection engine
//!
//! These traits define the contracts that allow the domain to be independent
//! of specific infrastructure implementations.

pub mod catalog_repository;
pub mod experiment_repository;
pub mod identity;
pub mod participation_repository;
pub mod sampler;

pub use catalog_repository::CatalogRepository;
pub use experiment_repository::{ExperimentFilter, ExperimentRepository, PoolMember};
pub use identity::{Identity, IdentityProvider};
pub use participation_repository::ParticipationRepository;
pub use sampler::{RngSampler, Sampler};
