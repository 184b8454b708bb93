//! Experiment repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Experiment, ExperimentGroup, GroupRole, Idea, IdeasGroup};

/// Filter criteria for listing experiments.
#[derive(Debug, Clone, Default)]
pub struct ExperimentFilter {
    pub running: Option<bool>,
    pub owner: Option<String>,
}

/// One idea together with the role of the group it was reached through.
///
/// An idea belonging to two groups of the same role appears once per
/// membership; the selection engine relies on that.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolMember {
    pub role: GroupRole,
    pub idea: Idea,
}

/// Repository interface for experiment persistence.
#[async_trait]
pub trait ExperimentRepository: Send + Sync {
    /// Create a new experiment.
    async fn create(&self, experiment: &Experiment) -> DomainResult<()>;

    /// Get an experiment by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Experiment>>;

    /// Update an existing experiment.
    async fn update(&self, experiment: &Experiment) -> DomainResult<()>;

    /// List experiments with optional filters.
    async fn list(&self, filter: ExperimentFilter) -> DomainResult<Vec<Experiment>>;

    /// Attach a group to an experiment with a role.
    ///
    /// Fails with `GroupAlreadyAttached` when the group is already linked to
    /// this experiment, whatever the role.
    async fn attach_group(&self, link: &ExperimentGroup) -> DomainResult<()>;

    /// List the groups attached to an experiment, with their roles.
    async fn attached_groups(&self, experiment_id: Uuid) -> DomainResult<Vec<(ExperimentGroup, IdeasGroup)>>;

    /// Flatten the experiment's attached groups into role-tagged pool members.
    async fn pool_members(&self, experiment_id: Uuid) -> DomainResult<Vec<PoolMember>>;
}
