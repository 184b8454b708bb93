//! Catalog administration: groups, ideas, and YAML seed import.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Idea, IdeasGroup};
use crate::domain::ports::CatalogRepository;

/// A group entry in a seed catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ideas: Vec<String>,
}

/// On-disk seed catalog format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCatalog {
    pub groups: Vec<SeedGroup>,
}

/// Outcome of a seed import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub groups_created: usize,
    pub groups_skipped: usize,
    pub ideas_created: usize,
}

pub struct CatalogService<C: CatalogRepository> {
    repository: Arc<C>,
}

impl<C: CatalogRepository> CatalogService<C> {
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    /// Create a new group.
    pub async fn create_group(&self, name: String, description: String) -> DomainResult<IdeasGroup> {
        let group = IdeasGroup::new(name, description);
        group.validate().map_err(DomainError::ValidationFailed)?;
        self.repository.create_group(&group).await?;
        Ok(group)
    }

    /// Create an idea and add it to a group.
    pub async fn add_idea(&self, group_id: Uuid, value: String) -> DomainResult<Idea> {
        self.repository
            .get_group(group_id)
            .await?
            .ok_or(DomainError::GroupNotFound(group_id))?;

        let idea = Idea::new(value);
        idea.validate().map_err(DomainError::ValidationFailed)?;
        self.repository.create_idea(&idea).await?;
        self.repository.add_idea_to_group(group_id, idea.id).await?;
        Ok(idea)
    }

    /// List all groups, ordered by name.
    pub async fn list_groups(&self) -> DomainResult<Vec<IdeasGroup>> {
        self.repository.list_groups().await
    }

    /// List the ideas of a group.
    pub async fn list_group_ideas(&self, group_id: Uuid) -> DomainResult<Vec<Idea>> {
        self.repository
            .get_group(group_id)
            .await?
            .ok_or(DomainError::GroupNotFound(group_id))?;
        self.repository.list_group_ideas(group_id).await
    }

    /// Import a seed catalog.
    ///
    /// Groups whose name already exists are skipped whole, so re-running an
    /// import cannot duplicate stimuli.
    pub async fn import_catalog(&self, catalog: SeedCatalog) -> DomainResult<ImportSummary> {
        let mut summary = ImportSummary::default();

        for seed in catalog.groups {
            if self.repository.get_group_by_name(&seed.name).await?.is_some() {
                warn!(group = %seed.name, "group already exists, skipping");
                summary.groups_skipped += 1;
                continue;
            }

            let group = IdeasGroup::new(seed.name.clone(), seed.description.clone());
            group.validate().map_err(DomainError::ValidationFailed)?;
            self.repository.create_group(&group).await?;
            summary.groups_created += 1;

            for value in seed.ideas {
                let idea = Idea::new(value);
                idea.validate().map_err(DomainError::ValidationFailed)?;
                self.repository.create_idea(&idea).await?;
                self.repository.add_idea_to_group(group.id, idea.id).await?;
                summary.ideas_created += 1;
            }

            info!(group = %group.name, "group imported");
        }

        Ok(summary)
    }
}
