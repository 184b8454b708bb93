//! Experiment administration and results review.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Experiment, ExperimentGroup, GroupRole, IdeasGroup, Participation, ResponseEntry,
};
use crate::domain::ports::{
    CatalogRepository, ExperimentFilter, ExperimentRepository, Identity, ParticipationRepository,
};

/// One logged response joined with the stimulus text it refers to.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub entry: ResponseEntry,
    pub idea_value: String,
}

/// A participant's full trace through an experiment.
#[derive(Debug, Clone)]
pub struct ParticipationResults {
    pub participation: Participation,
    pub rows: Vec<ResultRow>,
}

/// Aggregate results for an experiment.
#[derive(Debug, Clone)]
pub struct ExperimentResults {
    pub experiment: Experiment,
    pub participations: Vec<ParticipationResults>,
}

pub struct ExperimentService<E, P, C>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
{
    experiments: Arc<E>,
    participations: Arc<P>,
    catalog: Arc<C>,
}

impl<E, P, C> ExperimentService<E, P, C>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
{
    pub fn new(experiments: Arc<E>, participations: Arc<P>, catalog: Arc<C>) -> Self {
        Self { experiments, participations, catalog }
    }

    /// Create a new experiment.
    pub async fn create_experiment(
        &self,
        name: String,
        description: String,
        owner: Option<String>,
        idea_limit: i64,
        starting_rate: f64,
    ) -> DomainResult<Experiment> {
        let mut experiment = Experiment::new(name, description)
            .with_idea_limit(idea_limit)
            .with_starting_rate(starting_rate);
        if let Some(owner) = owner {
            experiment = experiment.with_owner(owner);
        }

        experiment.validate().map_err(DomainError::ValidationFailed)?;
        self.experiments.create(&experiment).await?;
        info!(experiment = %experiment.id, name = %experiment.name, "experiment created");

        Ok(experiment)
    }

    /// Get an experiment by ID.
    pub async fn get_experiment(&self, id: Uuid) -> DomainResult<Option<Experiment>> {
        self.experiments.get(id).await
    }

    /// List experiments with optional filters.
    pub async fn list_experiments(&self, filter: ExperimentFilter) -> DomainResult<Vec<Experiment>> {
        self.experiments.list(filter).await
    }

    /// List the experiments participants may currently join.
    pub async fn list_running(&self) -> DomainResult<Vec<Experiment>> {
        self.experiments
            .list(ExperimentFilter { running: Some(true), ..Default::default() })
            .await
    }

    /// Attach a group to an experiment with the given role.
    pub async fn attach_group(
        &self,
        experiment_id: Uuid,
        group_id: Uuid,
        role: GroupRole,
    ) -> DomainResult<ExperimentGroup> {
        self.experiments
            .get(experiment_id)
            .await?
            .ok_or(DomainError::ExperimentNotFound(experiment_id))?;
        self.catalog
            .get_group(group_id)
            .await?
            .ok_or(DomainError::GroupNotFound(group_id))?;

        let link = ExperimentGroup { experiment_id, group_id, role };
        self.experiments.attach_group(&link).await?;
        Ok(link)
    }

    /// List the groups attached to an experiment, with their roles.
    pub async fn attached_groups(
        &self,
        experiment_id: Uuid,
    ) -> DomainResult<Vec<(ExperimentGroup, IdeasGroup)>> {
        self.experiments.attached_groups(experiment_id).await
    }

    /// Flip the running flag.
    pub async fn set_running(&self, id: Uuid, running: bool) -> DomainResult<Experiment> {
        let mut experiment = self
            .experiments
            .get(id)
            .await?
            .ok_or(DomainError::ExperimentNotFound(id))?;

        experiment.running = running;
        experiment.updated_at = chrono::Utc::now();
        self.experiments.update(&experiment).await?;
        info!(experiment = %experiment.id, running, "experiment running flag changed");
        Ok(experiment)
    }

    /// Aggregate results for an experiment.
    ///
    /// When a requester is present they must be the experiment's owner; the
    /// CLI passes None and bypasses the ownership gate.
    pub async fn results(
        &self,
        experiment_id: Uuid,
        requester: Option<&Identity>,
    ) -> DomainResult<ExperimentResults> {
        let experiment = self
            .experiments
            .get(experiment_id)
            .await?
            .ok_or(DomainError::ExperimentNotFound(experiment_id))?;

        if let Some(identity) = requester {
            if !experiment.is_owned_by(&identity.participant) {
                return Err(DomainError::NotAuthorized(format!(
                    "{} does not own experiment {}",
                    identity.participant, experiment_id
                )));
            }
        }

        let mut participations = Vec::new();
        for participation in self.participations.list_for_experiment(experiment_id).await? {
            let entries = self.participations.list_entries(participation.id).await?;
            let mut rows = Vec::with_capacity(entries.len());
            for entry in entries {
                let idea_value = self
                    .catalog
                    .get_idea(entry.idea_id)
                    .await?
                    .map(|idea| idea.value)
                    .unwrap_or_default();
                rows.push(ResultRow { entry, idea_value });
            }
            participations.push(ParticipationResults { participation, rows });
        }

        Ok(ExperimentResults { experiment, participations })
    }
}
