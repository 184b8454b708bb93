//! Session-token identity provider backed by the sessions table.
//!
//! The upstream identity source is trusted: login only mints a token for
//! the participant name it is handed. No credentials are stored here.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::ports::{Identity, IdentityProvider};

#[derive(Clone)]
pub struct SqliteIdentityProvider {
    pool: SqlitePool,
}

impl SqliteIdentityProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for SqliteIdentityProvider {
    async fn login(&self, participant: &str) -> DomainResult<String> {
        let token = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO sessions (token, participant, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(participant)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    async fn resolve(&self, token: &str) -> DomainResult<Option<Identity>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT participant FROM sessions WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(participant,)| Identity { participant }))
    }

    async fn logout(&self, token: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
