//! SurrealDB implementation of [`MessageRepository`].

use chrono::{DateTime, Utc};
use dunning_core::error::DunningResult;
use dunning_core::models::message::{
    CreateMessage, Message, MessageFilter, MessageStatus, UpdateMessage,
};
use dunning_core::repository::{MessageRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, first_total, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MessageRow {
    tenant_id: String,
    customer_id: String,
    charge_id: Option<String>,
    phone: String,
    body: String,
    status: String,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    error: Option<String>,
    attempts: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct MessageRowWithId {
    record_id: String,
    tenant_id: String,
    customer_id: String,
    charge_id: Option<String>,
    phone: String,
    body: String,
    status: String,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    error: Option<String>,
    attempts: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<MessageStatus, DbError> {
    MessageStatus::parse(s)
        .ok_or_else(|| DbError::Corrupt(format!("unknown message status: {s}")))
}

impl MessageRow {
    fn into_message(self, id: Uuid) -> Result<Message, DbError> {
        Ok(Message {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            customer_id: parse_uuid(&self.customer_id, "customer")?,
            charge_id: parse_opt_uuid(self.charge_id, "charge")?,
            phone: self.phone,
            body: self.body,
            status: parse_status(&self.status)?,
            scheduled_at: self.scheduled_at,
            sent_at: self.sent_at,
            error: self.error,
            attempts: self.attempts,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl MessageRowWithId {
    fn try_into_message(self) -> Result<Message, DbError> {
        let id = parse_uuid(&self.record_id, "message")?;
        MessageRow {
            tenant_id: self.tenant_id,
            customer_id: self.customer_id,
            charge_id: self.charge_id,
            phone: self.phone,
            body: self.body,
            status: self.status,
            scheduled_at: self.scheduled_at,
            sent_at: self.sent_at,
            error: self.error,
            attempts: self.attempts,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_message(id)
    }
}

fn collect(rows: Vec<MessageRowWithId>) -> Result<Vec<Message>, DbError> {
    rows.into_iter().map(|row| row.try_into_message()).collect()
}

/// SurrealDB implementation of the Message repository.
#[derive(Clone)]
pub struct SurrealMessageRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMessageRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MessageRepository for SurrealMessageRepository<C> {
    async fn create(&self, tenant_id: Uuid, input: CreateMessage) -> DunningResult<Message> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('message', $id) SET \
                 tenant_id = $tenant_id, \
                 customer_id = $customer_id, \
                 charge_id = $charge_id, \
                 phone = $phone, \
                 body = $body, \
                 status = $status, \
                 scheduled_at = $scheduled_at, \
                 sent_at = NONE, \
                 error = NONE, \
                 attempts = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("customer_id", input.customer_id.to_string()))
            .bind(("charge_id", input.charge_id.map(|c| c.to_string())))
            .bind(("phone", input.phone))
            .bind(("body", input.body))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("scheduled_at", input.scheduled_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("message", &id_str))?;

        Ok(row.into_message(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<Message> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('message', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("message", id_str))?;

        Ok(row.into_message(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateMessage,
    ) -> DunningResult<Message> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.sent_at.is_some() {
            sets.push("sent_at = $sent_at");
        }
        if input.error.is_some() {
            sets.push("error = $error");
        }
        if input.attempts.is_some() {
            sets.push("attempts = $attempts");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('message', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(sent_at) = input.sent_at {
            // Some(None) clears the field.
            builder = builder.bind(("sent_at", sent_at));
        }
        if let Some(error) = input.error {
            builder = builder.bind(("error", error));
        }
        if let Some(attempts) = input.attempts {
            builder = builder.bind(("attempts", attempts));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("message", id_str))?;

        Ok(row.into_message(id)?)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: MessageFilter,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<Message>> {
        let mut conditions = vec!["tenant_id = $tenant_id"];
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.customer_id.is_some() {
            conditions.push("customer_id = $customer_id");
        }
        if filter.charge_id.is_some() {
            conditions.push("charge_id = $charge_id");
        }
        if filter.search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(body), $search) \
                 OR string::contains(phone, $search) \
                 OR customer_id INSIDE $search_customer_ids)",
            );
        }
        if filter.created_from.is_some() {
            conditions.push("created_at >= $created_from");
        }
        if filter.created_until.is_some() {
            conditions.push("created_at <= $created_until");
        }
        let where_clause = conditions.join(" AND ");

        let search_customer_ids: Vec<String> = filter
            .search_customer_ids
            .iter()
            .map(Uuid::to_string)
            .collect();

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM message WHERE {where_clause} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM message \
                 WHERE {where_clause} \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset"
            ))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", filter.status.map(|s| s.as_str().to_string())))
            .bind(("customer_id", filter.customer_id.map(|c| c.to_string())))
            .bind(("charge_id", filter.charge_id.map(|c| c.to_string())))
            .bind(("search", filter.search.map(|s| s.to_lowercase())))
            .bind(("search_customer_ids", search_customer_ids))
            .bind(("created_from", filter.created_from))
            .bind(("created_until", filter.created_until))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<MessageRowWithId> = result.take(1).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: collect(rows)?,
            total: first_total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn recent_for_charge(
        &self,
        tenant_id: Uuid,
        charge_id: Uuid,
        limit: u64,
    ) -> DunningResult<Vec<Message>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM message \
                 WHERE tenant_id = $tenant_id AND charge_id = $charge_id \
                 ORDER BY created_at DESC LIMIT $limit",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("charge_id", charge_id.to_string()))
            .bind(("limit", limit))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MessageRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }
}
