//! SQLite implementation of the ParticipationRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Participation, Reaction, ResponseEntry};
use crate::domain::ports::ParticipationRepository;

#[derive(Clone)]
pub struct SqliteParticipationRepository {
    pool: SqlitePool,
}

impl SqliteParticipationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const PARTICIPATION_COLUMNS: &str =
    "id, participant, experiment_id, expansion_rate, finished, created_at, updated_at";
const RESPONSE_COLUMNS: &str =
    "id, participation_id, seq, idea_id, did_expand, expansion_rate, reaction, created_at";

#[async_trait]
impl ParticipationRepository for SqliteParticipationRepository {
    async fn create(&self, participation: &Participation) -> DomainResult<()> {
        sqlx::query(
            r"INSERT INTO participations (id, participant, experiment_id, expansion_rate, finished, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(participation.id.to_string())
        .bind(&participation.participant)
        .bind(participation.experiment_id.to_string())
        .bind(participation.expansion_rate)
        .bind(participation.finished)
        .bind(participation.created_at.to_rfc3339())
        .bind(participation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Participation>> {
        let row: Option<ParticipationRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find(
        &self,
        participant: &str,
        experiment_id: Uuid,
    ) -> DomainResult<Option<Participation>> {
        let row: Option<ParticipationRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE participant = ? AND experiment_id = ?"
        ))
        .bind(participant)
        .bind(experiment_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, participation: &Participation) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE participations SET expansion_rate = ?, finished = ?, updated_at = ? WHERE id = ?",
        )
        .bind(participation.expansion_rate)
        .bind(participation.finished)
        .bind(participation.updated_at.to_rfc3339())
        .bind(participation.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ParticipationNotFound(participation.id));
        }

        Ok(())
    }

    async fn list_for_experiment(&self, experiment_id: Uuid) -> DomainResult<Vec<Participation>> {
        let rows: Vec<ParticipationRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE experiment_id = ? ORDER BY participant"
        ))
        .bind(experiment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn append_entry(&self, entry: &ResponseEntry) -> DomainResult<()> {
        sqlx::query(
            r"INSERT INTO responses (id, participation_id, seq, idea_id, did_expand, expansion_rate, reaction, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(entry.participation_id.to_string())
        .bind(i64::from(entry.seq))
        .bind(entry.idea_id.to_string())
        .bind(entry.did_expand)
        .bind(entry.expansion_rate)
        .bind(entry.reaction.as_str())
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_entry(&self, entry: &ResponseEntry) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE responses SET reaction = ?, expansion_rate = ? WHERE id = ?",
        )
        .bind(entry.reaction.as_str())
        .bind(entry.expansion_rate)
        .bind(entry.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ParticipationNotFound(entry.participation_id));
        }

        Ok(())
    }

    async fn list_entries(&self, participation_id: Uuid) -> DomainResult<Vec<ResponseEntry>> {
        let rows: Vec<ResponseRow> = sqlx::query_as(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE participation_id = ? ORDER BY seq"
        ))
        .bind(participation_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn latest_entry(&self, participation_id: Uuid) -> DomainResult<Option<ResponseEntry>> {
        let row: Option<ResponseRow> = sqlx::query_as(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE participation_id = ? ORDER BY seq DESC LIMIT 1"
        ))
        .bind(participation_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn count_entries(&self, participation_id: Uuid) -> DomainResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM responses WHERE participation_id = ?")
                .bind(participation_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[derive(sqlx::FromRow)]
struct ParticipationRow {
    id: String,
    participant: String,
    experiment_id: String,
    expansion_rate: f64,
    finished: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ParticipationRow> for Participation {
    type Error = DomainError;

    fn try_from(row: ParticipationRow) -> Result<Self, Self::Error> {
        Ok(Participation {
            id: parse_uuid(&row.id)?,
            participant: row.participant,
            experiment_id: parse_uuid(&row.experiment_id)?,
            expansion_rate: row.expansion_rate,
            finished: row.finished,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    id: String,
    participation_id: String,
    seq: i64,
    idea_id: String,
    did_expand: bool,
    expansion_rate: f64,
    reaction: String,
    created_at: String,
}

impl TryFrom<ResponseRow> for ResponseEntry {
    type Error = DomainError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let reaction = Reaction::from_str(&row.reaction).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid reaction: {}", row.reaction))
        })?;
        let seq = u32::try_from(row.seq)
            .map_err(|_| DomainError::SerializationError(format!("Invalid seq: {}", row.seq)))?;

        Ok(ResponseEntry {
            id: parse_uuid(&row.id)?,
            participation_id: parse_uuid(&row.participation_id)?,
            seq,
            idea_id: parse_uuid(&row.idea_id)?,
            did_expand: row.did_expand,
            expansion_rate: row.expansion_rate,
            reaction,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
