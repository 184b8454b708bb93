//! SQLite implementation of the ExperimentRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Experiment, ExperimentGroup, GroupRole, Idea, IdeasGroup};
use crate::domain::ports::{ExperimentFilter, ExperimentRepository, PoolMember};

#[derive(Clone)]
pub struct SqliteExperimentRepository {
    pool: SqlitePool,
}

impl SqliteExperimentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const EXPERIMENT_COLUMNS: &str = "id, name, description, owner, running, idea_limit, starting_expansion_rate, created_at, updated_at";

#[async_trait]
impl ExperimentRepository for SqliteExperimentRepository {
    async fn create(&self, experiment: &Experiment) -> DomainResult<()> {
        sqlx::query(
            r"INSERT INTO experiments (id, name, description, owner, running, idea_limit, starting_expansion_rate, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(experiment.id.to_string())
        .bind(&experiment.name)
        .bind(&experiment.description)
        .bind(experiment.owner.as_deref())
        .bind(experiment.running)
        .bind(experiment.idea_limit.map(i64::from))
        .bind(experiment.starting_expansion_rate)
        .bind(experiment.created_at.to_rfc3339())
        .bind(experiment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Experiment>> {
        let row: Option<ExperimentRow> = sqlx::query_as(&format!(
            "SELECT {EXPERIMENT_COLUMNS} FROM experiments WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, experiment: &Experiment) -> DomainResult<()> {
        let result = sqlx::query(
            r"UPDATE experiments SET name = ?, description = ?, owner = ?, running = ?,
              idea_limit = ?, starting_expansion_rate = ?, updated_at = ?
              WHERE id = ?",
        )
        .bind(&experiment.name)
        .bind(&experiment.description)
        .bind(experiment.owner.as_deref())
        .bind(experiment.running)
        .bind(experiment.idea_limit.map(i64::from))
        .bind(experiment.starting_expansion_rate)
        .bind(experiment.updated_at.to_rfc3339())
        .bind(experiment.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ExperimentNotFound(experiment.id));
        }

        Ok(())
    }

    async fn list(&self, filter: ExperimentFilter) -> DomainResult<Vec<Experiment>> {
        let mut query = format!("SELECT {EXPERIMENT_COLUMNS} FROM experiments WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(running) = filter.running {
            query.push_str(" AND running = ?");
            bindings.push(i64::from(running).to_string());
        }

        if let Some(owner) = &filter.owner {
            query.push_str(" AND owner = ?");
            bindings.push(owner.clone());
        }

        query.push_str(" ORDER BY created_at");

        let mut q = sqlx::query_as::<_, ExperimentRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<ExperimentRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn attach_group(&self, link: &ExperimentGroup) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO experiment_groups (experiment_id, group_id, role) VALUES (?, ?, ?)",
        )
        .bind(link.experiment_id.to_string())
        .bind(link.group_id.to_string())
        .bind(link.role.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::GroupAlreadyAttached {
                experiment: link.experiment_id,
                group: link.group_id,
            });
        }

        Ok(())
    }

    async fn attached_groups(
        &self,
        experiment_id: Uuid,
    ) -> DomainResult<Vec<(ExperimentGroup, IdeasGroup)>> {
        let rows: Vec<AttachedGroupRow> = sqlx::query_as(
            "SELECT eg.experiment_id, eg.group_id, eg.role, g.name, g.description, g.created_at
             FROM experiment_groups eg
             JOIN idea_groups g ON g.id = eg.group_id
             WHERE eg.experiment_id = ?
             ORDER BY g.name",
        )
        .bind(experiment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn pool_members(&self, experiment_id: Uuid) -> DomainResult<Vec<PoolMember>> {
        let rows: Vec<PoolMemberRow> = sqlx::query_as(
            "SELECT eg.role, i.id, i.value, i.created_at
             FROM experiment_groups eg
             JOIN idea_group_members m ON m.group_id = eg.group_id
             JOIN ideas i ON i.id = m.idea_id
             WHERE eg.experiment_id = ?",
        )
        .bind(experiment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ExperimentRow {
    id: String,
    name: String,
    description: Option<String>,
    owner: Option<String>,
    running: bool,
    idea_limit: Option<i64>,
    starting_expansion_rate: f64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ExperimentRow> for Experiment {
    type Error = DomainError;

    fn try_from(row: ExperimentRow) -> Result<Self, Self::Error> {
        let idea_limit = row
            .idea_limit
            .map(|l| {
                u32::try_from(l).map_err(|_| {
                    DomainError::SerializationError(format!("Invalid idea limit: {l}"))
                })
            })
            .transpose()?;

        Ok(Experiment {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description.unwrap_or_default(),
            owner: row.owner,
            running: row.running,
            idea_limit,
            starting_expansion_rate: row.starting_expansion_rate,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AttachedGroupRow {
    experiment_id: String,
    group_id: String,
    role: String,
    name: String,
    description: Option<String>,
    created_at: String,
}

impl TryFrom<AttachedGroupRow> for (ExperimentGroup, IdeasGroup) {
    type Error = DomainError;

    fn try_from(row: AttachedGroupRow) -> Result<Self, Self::Error> {
        let role = GroupRole::from_str(&row.role)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid role: {}", row.role)))?;
        let group_id = parse_uuid(&row.group_id)?;

        Ok((
            ExperimentGroup {
                experiment_id: parse_uuid(&row.experiment_id)?,
                group_id,
                role,
            },
            IdeasGroup {
                id: group_id,
                name: row.name,
                description: row.description.unwrap_or_default(),
                created_at: parse_datetime(&row.created_at)?,
            },
        ))
    }
}

#[derive(sqlx::FromRow)]
struct PoolMemberRow {
    role: String,
    id: String,
    value: String,
    created_at: String,
}

impl TryFrom<PoolMemberRow> for PoolMember {
    type Error = DomainError;

    fn try_from(row: PoolMemberRow) -> Result<Self, Self::Error> {
        let role = GroupRole::from_str(&row.role)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid role: {}", row.role)))?;

        Ok(PoolMember {
            role,
            idea: Idea {
                id: parse_uuid(&row.id)?,
                value: row.value,
                created_at: parse_datetime(&row.created_at)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        all_embedded_migrations, create_test_pool, Migrator, SqliteCatalogRepository,
    };
    use crate::domain::ports::CatalogRepository;

    async fn setup() -> (SqliteExperimentRepository, SqliteCatalogRepository) {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap();
        (
            SqliteExperimentRepository::new(pool.clone()),
            SqliteCatalogRepository::new(pool),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_experiment() {
        let (repo, _) = setup().await;
        let exp = Experiment::new("Egg drop", "Protect the egg")
            .with_owner("alice")
            .with_idea_limit(10)
            .with_starting_rate(0.3);

        repo.create(&exp).await.unwrap();

        let retrieved = repo.get(exp.id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "Egg drop");
        assert_eq!(retrieved.owner.as_deref(), Some("alice"));
        assert_eq!(retrieved.idea_limit, Some(10));
        assert!((retrieved.starting_expansion_rate - 0.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_list_filters_running() {
        let (repo, _) = setup().await;
        repo.create(&Experiment::new("stopped", "")).await.unwrap();
        repo.create(&Experiment::new("live", "").with_running(true)).await.unwrap();

        let running = repo
            .list(ExperimentFilter { running: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].name, "live");
    }

    #[tokio::test]
    async fn test_group_attached_at_most_once() {
        let (repo, catalog) = setup().await;
        let exp = Experiment::new("e", "");
        repo.create(&exp).await.unwrap();

        let group = IdeasGroup::new("g", "");
        catalog.create_group(&group).await.unwrap();

        let link = ExperimentGroup {
            experiment_id: exp.id,
            group_id: group.id,
            role: GroupRole::Fixation,
        };
        repo.attach_group(&link).await.unwrap();

        // same group again, even with the other role, is rejected
        let other_role = ExperimentGroup { role: GroupRole::Expansion, ..link };
        let err = repo.attach_group(&other_role).await.unwrap_err();
        assert!(matches!(err, DomainError::GroupAlreadyAttached { .. }));
    }

    #[tokio::test]
    async fn test_pool_members_flatten_groups() {
        let (repo, catalog) = setup().await;
        let exp = Experiment::new("e", "");
        repo.create(&exp).await.unwrap();

        let fixation = IdeasGroup::new("fix", "");
        let expansion = IdeasGroup::new("exp", "");
        catalog.create_group(&fixation).await.unwrap();
        catalog.create_group(&expansion).await.unwrap();

        for (group, value) in [(&fixation, "f1"), (&fixation, "f2"), (&expansion, "e1")] {
            let idea = Idea::new(value);
            catalog.create_idea(&idea).await.unwrap();
            catalog.add_idea_to_group(group.id, idea.id).await.unwrap();
        }

        repo.attach_group(&ExperimentGroup {
            experiment_id: exp.id,
            group_id: fixation.id,
            role: GroupRole::Fixation,
        })
        .await
        .unwrap();
        repo.attach_group(&ExperimentGroup {
            experiment_id: exp.id,
            group_id: expansion.id,
            role: GroupRole::Expansion,
        })
        .await
        .unwrap();

        let members = repo.pool_members(exp.id).await.unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members.iter().filter(|m| m.role == GroupRole::Fixation).count(), 2);
        assert_eq!(members.iter().filter(|m| m.role == GroupRole::Expansion).count(), 1);
    }
}
