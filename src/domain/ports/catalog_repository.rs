//! Stimulus catalog repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Idea, IdeasGroup};

/// Repository interface for the idea/group catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Create a new idea.
    async fn create_idea(&self, idea: &Idea) -> DomainResult<()>;

    /// Get an idea by ID.
    async fn get_idea(&self, id: Uuid) -> DomainResult<Option<Idea>>;

    /// Create a new group.
    async fn create_group(&self, group: &IdeasGroup) -> DomainResult<()>;

    /// Get a group by ID.
    async fn get_group(&self, id: Uuid) -> DomainResult<Option<IdeasGroup>>;

    /// Get a group by its unique name.
    async fn get_group_by_name(&self, name: &str) -> DomainResult<Option<IdeasGroup>>;

    /// List all groups, ordered by name.
    async fn list_groups(&self) -> DomainResult<Vec<IdeasGroup>>;

    /// Add an idea to a group. Adding twice is a no-op.
    async fn add_idea_to_group(&self, group_id: Uuid, idea_id: Uuid) -> DomainResult<()>;

    /// List the ideas belonging to a group.
    async fn list_group_ideas(&self, group_id: Uuid) -> DomainResult<Vec<Idea>>;
}
