//! SurrealDB implementation of [`RefreshTokenRepository`].

use chrono::{DateTime, Utc};
use dunning_core::error::DunningResult;
use dunning_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use dunning_core::repository::RefreshTokenRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RefreshTokenRow {
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RefreshTokenRowWithId {
    record_id: String,
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn row_to_token(row: RefreshTokenRow, id: Uuid) -> Result<RefreshToken, DbError> {
    Ok(RefreshToken {
        id,
        user_id: parse_uuid(&row.user_id, "user")?,
        token_hash: row.token_hash,
        expires_at: row.expires_at,
        created_at: row.created_at,
    })
}

impl RefreshTokenRowWithId {
    fn try_into_token(self) -> Result<RefreshToken, DbError> {
        Ok(RefreshToken {
            id: parse_uuid(&self.record_id, "refresh token")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the RefreshToken repository.
#[derive(Clone)]
pub struct SurrealRefreshTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRefreshTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn delete_where(
        &self,
        condition: &str,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DunningResult<u64> {
        let query = format!("DELETE refresh_token WHERE {condition} RETURN BEFORE");
        let mut result = self
            .db
            .query(&query)
            .bind(("user_id", user_id.map(|u| u.to_string())))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RefreshTokenRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }
}

impl<C: Connection> RefreshTokenRepository for SurrealRefreshTokenRepository<C> {
    async fn create(&self, input: CreateRefreshToken) -> DunningResult<RefreshToken> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('refresh_token', $id) SET \
                 user_id = $user_id, \
                 token_hash = $token_hash, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "refresh token", "token"))?;

        let rows: Vec<RefreshTokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("refresh token", &id_str))?;

        Ok(row_to_token(row, id)?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> DunningResult<RefreshToken> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM refresh_token \
                 WHERE token_hash = $token_hash LIMIT 1",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        // The hash itself is a credential; keep it out of error messages.
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("refresh token", "<redacted>"))?;

        Ok(row.try_into_token()?)
    }

    async fn delete(&self, id: Uuid) -> DunningResult<()> {
        self.db
            .query("DELETE type::record('refresh_token', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> DunningResult<()> {
        self.db
            .query("DELETE refresh_token WHERE token_hash = $token_hash")
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> DunningResult<()> {
        self.delete_where("user_id = $user_id", Some(user_id), Utc::now())
            .await
            .map(|_| ())
    }

    async fn delete_expired_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DunningResult<u64> {
        self.delete_where(
            "user_id = $user_id AND expires_at <= $now",
            Some(user_id),
            now,
        )
        .await
    }

    async fn delete_all_expired(&self, now: DateTime<Utc>) -> DunningResult<u64> {
        self.delete_where("expires_at <= $now", None, now).await
    }
}
