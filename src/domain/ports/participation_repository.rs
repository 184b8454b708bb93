//! Participation repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Participation, ResponseEntry};

/// Repository interface for participation records and their response log.
#[async_trait]
pub trait ParticipationRepository: Send + Sync {
    /// Create a new participation.
    async fn create(&self, participation: &Participation) -> DomainResult<()>;

    /// Get a participation by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Participation>>;

    /// Find the participation for a (participant, experiment) pair.
    async fn find(&self, participant: &str, experiment_id: Uuid) -> DomainResult<Option<Participation>>;

    /// Persist rate/finished changes to a participation.
    async fn update(&self, participation: &Participation) -> DomainResult<()>;

    /// List all participations for an experiment.
    async fn list_for_experiment(&self, experiment_id: Uuid) -> DomainResult<Vec<Participation>>;

    /// Append a response entry. The UNIQUE(participation, seq) constraint
    /// rejects duplicate sequence numbers.
    async fn append_entry(&self, entry: &ResponseEntry) -> DomainResult<()>;

    /// Overwrite the reaction and rate recorded on an existing entry.
    async fn update_entry(&self, entry: &ResponseEntry) -> DomainResult<()>;

    /// List a participation's entries ordered by sequence number.
    async fn list_entries(&self, participation_id: Uuid) -> DomainResult<Vec<ResponseEntry>>;

    /// Get the highest-sequence entry, if any.
    async fn latest_entry(&self, participation_id: Uuid) -> DomainResult<Option<ResponseEntry>>;

    /// Count the entries logged for a participation.
    async fn count_entries(&self, participation_id: Uuid) -> DomainResult<u64>;
}
