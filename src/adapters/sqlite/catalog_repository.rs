//! SQLite implementation of the CatalogRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Idea, IdeasGroup};
use crate::domain::ports::CatalogRepository;

#[derive(Clone)]
pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn create_idea(&self, idea: &Idea) -> DomainResult<()> {
        sqlx::query("INSERT INTO ideas (id, value, created_at) VALUES (?, ?, ?)")
            .bind(idea.id.to_string())
            .bind(&idea.value)
            .bind(idea.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_idea(&self, id: Uuid) -> DomainResult<Option<Idea>> {
        let row: Option<IdeaRow> =
            sqlx::query_as("SELECT id, value, created_at FROM ideas WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn create_group(&self, group: &IdeasGroup) -> DomainResult<()> {
        sqlx::query("INSERT INTO idea_groups (id, name, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(group.id.to_string())
            .bind(&group.name)
            .bind(&group.description)
            .bind(group.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_group(&self, id: Uuid) -> DomainResult<Option<IdeasGroup>> {
        let row: Option<GroupRow> =
            sqlx::query_as("SELECT id, name, description, created_at FROM idea_groups WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_group_by_name(&self, name: &str) -> DomainResult<Option<IdeasGroup>> {
        let row: Option<GroupRow> =
            sqlx::query_as("SELECT id, name, description, created_at FROM idea_groups WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_groups(&self) -> DomainResult<Vec<IdeasGroup>> {
        let rows: Vec<GroupRow> =
            sqlx::query_as("SELECT id, name, description, created_at FROM idea_groups ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add_idea_to_group(&self, group_id: Uuid, idea_id: Uuid) -> DomainResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO idea_group_members (group_id, idea_id) VALUES (?, ?)",
        )
        .bind(group_id.to_string())
        .bind(idea_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_group_ideas(&self, group_id: Uuid) -> DomainResult<Vec<Idea>> {
        let rows: Vec<IdeaRow> = sqlx::query_as(
            "SELECT i.id, i.value, i.created_at FROM ideas i
             JOIN idea_group_members m ON m.idea_id = i.id
             WHERE m.group_id = ?
             ORDER BY i.created_at",
        )
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct IdeaRow {
    id: String,
    value: String,
    created_at: String,
}

impl TryFrom<IdeaRow> for Idea {
    type Error = DomainError;

    fn try_from(row: IdeaRow) -> Result<Self, Self::Error> {
        Ok(Idea {
            id: parse_uuid(&row.id)?,
            value: row.value,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: String,
    name: String,
    description: Option<String>,
    created_at: String,
}

impl TryFrom<GroupRow> for IdeasGroup {
    type Error = DomainError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        Ok(IdeasGroup {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description.unwrap_or_default(),
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};

    async fn setup_test_repo() -> SqliteCatalogRepository {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap();
        SqliteCatalogRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_idea() {
        let repo = setup_test_repo().await;
        let idea = Idea::new("wrap the egg in foam");

        repo.create_idea(&idea).await.unwrap();

        let retrieved = repo.get_idea(idea.id).await.unwrap().unwrap();
        assert_eq!(retrieved.value, "wrap the egg in foam");
    }

    #[tokio::test]
    async fn test_groups_listed_by_name() {
        let repo = setup_test_repo().await;
        repo.create_group(&IdeasGroup::new("slowing", "slow the fall")).await.unwrap();
        repo.create_group(&IdeasGroup::new("cushioning", "soften the landing")).await.unwrap();

        let groups = repo.list_groups().await.unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["cushioning", "slowing"]);
    }

    #[tokio::test]
    async fn test_group_membership() {
        let repo = setup_test_repo().await;
        let group = IdeasGroup::new("cushioning", "");
        repo.create_group(&group).await.unwrap();

        let idea = Idea::new("pile of pillows");
        repo.create_idea(&idea).await.unwrap();
        repo.add_idea_to_group(group.id, idea.id).await.unwrap();
        // adding twice is a no-op
        repo.add_idea_to_group(group.id, idea.id).await.unwrap();

        let ideas = repo.list_group_ideas(group.id).await.unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].id, idea.id);
    }

    #[tokio::test]
    async fn test_get_group_by_name() {
        let repo = setup_test_repo().await;
        let group = IdeasGroup::new("catching", "intercept the fall");
        repo.create_group(&group).await.unwrap();

        let found = repo.get_group_by_name("catching").await.unwrap().unwrap();
        assert_eq!(found.id, group.id);
        assert!(repo.get_group_by_name("missing").await.unwrap().is_none());
    }
}
