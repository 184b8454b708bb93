pub mod catalog_service;
pub mod experiment_service;
pub mod participation_service;
pub mod selection_engine;

pub use catalog_service::{CatalogService, ImportSummary, SeedCatalog, SeedGroup};
pub use experiment_service::{
    ExperimentResults, ExperimentService, ParticipationResults, ResultRow,
};
pub use participation_service::{ParticipationService, StepOutcome};
pub use selection_engine::{Pools, RATE_STEP};
