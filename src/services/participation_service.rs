//! Participation service implementing the stepping state machine.
//!
//! A participation moves NOT_STARTED -> IN_PROGRESS -> FINISHED. The first
//! visit creates the record and draws the first stimulus; while the latest
//! log entry still carries the sentinel reaction, visits re-display that
//! stimulus; a submitted reaction adjusts the expansion rate; and once
//! either pool runs dry (or the experiment's idea limit is hit) the
//! participation finishes for good.
//!
//! Steps for one participation are serialized behind a per-key async mutex,
//! so two concurrent requests for the same participant cannot interleave the
//! read-decide-write sequence.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Experiment, Idea, Participation, Reaction, ResponseEntry};
use crate::domain::ports::{
    CatalogRepository, ExperimentRepository, Identity, ParticipationRepository, Sampler,
};
use crate::services::selection_engine;

/// What a participant sees when they (re-)enter an experiment.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// A stimulus awaiting the participant's reaction.
    Stimulus {
        participation: Participation,
        entry: ResponseEntry,
        idea: Idea,
    },
    /// The participation is finished; nothing further will be drawn.
    Finished { participation: Participation },
}

pub struct ParticipationService<E, P, C>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
{
    experiments: Arc<E>,
    participations: Arc<P>,
    catalog: Arc<C>,
    sampler: StdMutex<Box<dyn Sampler>>,
    step_locks: StdMutex<HashMap<(String, Uuid), Arc<AsyncMutex<()>>>>,
}

impl<E, P, C> ParticipationService<E, P, C>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
{
    pub fn new(
        experiments: Arc<E>,
        participations: Arc<P>,
        catalog: Arc<C>,
        sampler: Box<dyn Sampler>,
    ) -> Self {
        Self {
            experiments,
            participations,
            catalog,
            sampler: StdMutex::new(sampler),
            step_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Present the current step for a participant in an experiment.
    ///
    /// Creates the participation on first visit, re-displays the pending
    /// stimulus when one is awaiting a reaction, draws the next stimulus
    /// when the previous one has been answered, and finishes the
    /// participation when the stopping condition holds.
    pub async fn current_step(
        &self,
        identity: &Identity,
        experiment_id: Uuid,
    ) -> DomainResult<StepOutcome> {
        let experiment = self.running_experiment(experiment_id).await?;

        let lock = self.step_lock(&identity.participant, experiment_id);
        let _guard = lock.lock().await;

        let mut participation = match self
            .participations
            .find(&identity.participant, experiment_id)
            .await?
        {
            Some(p) => p,
            None => {
                let p = Participation::new(
                    identity.participant.clone(),
                    experiment_id,
                    experiment.starting_expansion_rate,
                );
                self.participations.create(&p).await?;
                info!(
                    participant = %p.participant,
                    experiment = %experiment_id,
                    rate = p.expansion_rate,
                    "participation started"
                );
                p
            }
        };

        if participation.finished {
            return Ok(StepOutcome::Finished { participation });
        }

        // Re-display while the latest stimulus is unanswered.
        if let Some(entry) = self.participations.latest_entry(participation.id).await? {
            if entry.is_awaiting_reaction() {
                let idea = self
                    .catalog
                    .get_idea(entry.idea_id)
                    .await?
                    .ok_or(DomainError::IdeaNotFound(entry.idea_id))?;
                return Ok(StepOutcome::Stimulus { participation, entry, idea });
            }
        }

        self.advance(&experiment, &mut participation).await
    }

    /// Attach a reaction to the latest unanswered stimulus.
    ///
    /// Missing, sentinel, or out-of-place submissions (no participation yet,
    /// already answered, already finished) are silently ignored; the
    /// follow-up GET simply re-displays the current state.
    pub async fn submit_reaction(
        &self,
        identity: &Identity,
        experiment_id: Uuid,
        reaction: Option<Reaction>,
    ) -> DomainResult<()> {
        self.running_experiment(experiment_id).await?;

        let Some(reaction) = reaction.filter(Reaction::is_answered) else {
            return Ok(());
        };

        let lock = self.step_lock(&identity.participant, experiment_id);
        let _guard = lock.lock().await;

        let Some(mut participation) = self
            .participations
            .find(&identity.participant, experiment_id)
            .await?
        else {
            return Ok(());
        };

        if participation.finished {
            return Ok(());
        }

        let Some(mut entry) = self.participations.latest_entry(participation.id).await? else {
            return Ok(());
        };

        if !entry.is_awaiting_reaction() {
            // Double submission (page refresh, second tab): last write already
            // landed, ignore.
            return Ok(());
        }

        let updated_rate =
            selection_engine::adjust_rate(participation.expansion_rate, entry.did_expand, reaction);

        entry.reaction = reaction;
        entry.expansion_rate = updated_rate;
        self.participations.update_entry(&entry).await?;

        participation.set_rate(updated_rate);
        self.participations.update(&participation).await?;

        debug!(
            participant = %participation.participant,
            experiment = %experiment_id,
            seq = entry.seq,
            reaction = reaction.as_str(),
            rate = updated_rate,
            "reaction recorded"
        );

        Ok(())
    }

    /// Draw the next stimulus or finish the participation.
    async fn advance(
        &self,
        experiment: &Experiment,
        participation: &mut Participation,
    ) -> DomainResult<StepOutcome> {
        let entries = self.participations.list_entries(participation.id).await?;
        let seen: Vec<Uuid> = entries.iter().map(|e| e.idea_id).collect();

        let members = self.experiments.pool_members(experiment.id).await?;
        let mut pools = selection_engine::partition_pools(members);
        selection_engine::exclude_seen(&mut pools, &seen);

        let limit_reached = experiment
            .idea_limit
            .is_some_and(|limit| entries.len() as u64 >= u64::from(limit));

        if limit_reached || pools.either_empty() {
            participation.finish();
            self.participations.update(participation).await?;
            info!(
                participant = %participation.participant,
                experiment = %experiment.id,
                steps = entries.len(),
                "participation finished"
            );
            return Ok(StepOutcome::Finished { participation: participation.clone() });
        }

        let (idea, did_expand) = {
            let mut sampler = self
                .sampler
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            selection_engine::draw_next(&pools, participation.expansion_rate, sampler.as_mut())?
        };

        let entry = ResponseEntry::new(
            participation.id,
            u32::try_from(entries.len())
                .map_err(|_| DomainError::ValidationFailed("response log overflow".into()))?,
            idea.id,
            did_expand,
            participation.expansion_rate,
        );
        self.participations.append_entry(&entry).await?;

        debug!(
            participant = %participation.participant,
            experiment = %experiment.id,
            seq = entry.seq,
            did_expand,
            "stimulus drawn"
        );

        Ok(StepOutcome::Stimulus {
            participation: participation.clone(),
            entry,
            idea,
        })
    }

    /// Load an experiment that participants may currently join.
    async fn running_experiment(&self, experiment_id: Uuid) -> DomainResult<Experiment> {
        let experiment = self
            .experiments
            .get(experiment_id)
            .await?
            .ok_or(DomainError::ExperimentNotFound(experiment_id))?;

        if !experiment.running {
            return Err(DomainError::ExperimentNotRunning(experiment_id));
        }

        Ok(experiment)
    }

    fn step_lock(&self, participant: &str, experiment_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .step_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks
            .entry((participant.to_string(), experiment_id))
            .or_default()
            .clone()
    }
}
