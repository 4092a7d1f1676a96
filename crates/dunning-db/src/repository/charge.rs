//! SurrealDB implementation of [`ChargeRepository`].
//!
//! Due dates are stored as midnight UTC datetimes so that range
//! filters compare whole days.

use chrono::{DateTime, NaiveDate, Utc};
use dunning_core::error::DunningResult;
use dunning_core::models::charge::{
    Charge, ChargeFilter, ChargeStatus, ChargeTotals, CreateCharge, UpdateCharge,
};
use dunning_core::repository::{ChargeRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{date_to_datetime, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ChargeRow {
    tenant_id: String,
    customer_id: String,
    amount: f64,
    due_date: DateTime<Utc>,
    status: String,
    pix_qr_code: Option<String>,
    pix_copy_paste: Option<String>,
    notes: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ChargeRowWithId {
    record_id: String,
    tenant_id: String,
    customer_id: String,
    amount: f64,
    due_date: DateTime<Utc>,
    status: String,
    pix_qr_code: Option<String>,
    pix_copy_paste: Option<String>,
    notes: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct TotalsRow {
    total: u64,
    amount: f64,
}

fn parse_status(s: &str) -> Result<ChargeStatus, DbError> {
    ChargeStatus::parse(s).ok_or_else(|| DbError::Corrupt(format!("unknown charge status: {s}")))
}

impl ChargeRow {
    fn into_charge(self, id: Uuid) -> Result<Charge, DbError> {
        Ok(Charge {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            customer_id: parse_uuid(&self.customer_id, "customer")?,
            amount: self.amount,
            due_date: self.due_date.date_naive(),
            status: parse_status(&self.status)?,
            pix_qr_code: self.pix_qr_code,
            pix_copy_paste: self.pix_copy_paste,
            notes: self.notes,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ChargeRowWithId {
    fn try_into_charge(self) -> Result<Charge, DbError> {
        let id = parse_uuid(&self.record_id, "charge")?;
        ChargeRow {
            tenant_id: self.tenant_id,
            customer_id: self.customer_id,
            amount: self.amount,
            due_date: self.due_date,
            status: self.status,
            pix_qr_code: self.pix_qr_code,
            pix_copy_paste: self.pix_copy_paste,
            notes: self.notes,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_charge(id)
    }
}

/// WHERE clause for a filter. Every parameter it may reference is
/// always bound, unset ones as NONE.
fn filter_clause(filter: &ChargeFilter) -> String {
    let mut conditions = vec!["tenant_id = $tenant_id"];
    if !filter.statuses.is_empty() {
        conditions.push("status INSIDE $statuses");
    }
    if filter.customer_id.is_some() {
        conditions.push("customer_id = $customer_id");
    }
    if filter.due_from.is_some() {
        conditions.push("due_date >= $due_from");
    }
    if filter.due_before.is_some() {
        conditions.push("due_date < $due_before");
    }
    if filter.paid_from.is_some() {
        conditions.push("paid_at >= $paid_from");
    }
    if filter.paid_before.is_some() {
        conditions.push("paid_at < $paid_before");
    }
    conditions.join(" AND ")
}

fn statuses(filter: &ChargeFilter) -> Vec<String> {
    filter
        .statuses
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

/// SurrealDB implementation of the Charge repository.
#[derive(Clone)]
pub struct SurrealChargeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChargeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(
        &self,
        tenant_id: Uuid,
        filter: &ChargeFilter,
        pagination: Option<Pagination>,
    ) -> Result<Vec<Charge>, DbError> {
        let page_clause = if pagination.is_some() {
            " LIMIT $limit START $offset"
        } else {
            ""
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM charge \
             WHERE {} ORDER BY due_date ASC, created_at ASC{page_clause}",
            filter_clause(filter)
        );
        let pagination = pagination.unwrap_or_default();

        let mut result = self
            .db
            .query(&query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("statuses", statuses(filter)))
            .bind(("customer_id", filter.customer_id.map(|c| c.to_string())))
            .bind(("due_from", filter.due_from.map(date_to_datetime)))
            .bind(("due_before", filter.due_before.map(date_to_datetime)))
            .bind(("paid_from", filter.paid_from))
            .bind(("paid_before", filter.paid_before))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await?;

        let rows: Vec<ChargeRowWithId> = result.take(0)?;
        rows.into_iter().map(|row| row.try_into_charge()).collect()
    }

    async fn aggregate(
        &self,
        tenant_id: Uuid,
        filter: &ChargeFilter,
    ) -> Result<ChargeTotals, DbError> {
        let query = format!(
            "SELECT count() AS total, <float> math::sum(amount) AS amount \
             FROM charge WHERE {} GROUP ALL",
            filter_clause(filter)
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("statuses", statuses(filter)))
            .bind(("customer_id", filter.customer_id.map(|c| c.to_string())))
            .bind(("due_from", filter.due_from.map(date_to_datetime)))
            .bind(("due_before", filter.due_before.map(date_to_datetime)))
            .bind(("paid_from", filter.paid_from))
            .bind(("paid_before", filter.paid_before))
            .await?;

        let rows: Vec<TotalsRow> = result.take(0)?;
        Ok(rows
            .first()
            .map(|r| ChargeTotals {
                amount: r.amount,
                count: r.total,
            })
            .unwrap_or_default())
    }
}

impl<C: Connection> ChargeRepository for SurrealChargeRepository<C> {
    async fn create(&self, tenant_id: Uuid, input: CreateCharge) -> DunningResult<Charge> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('charge', $id) SET \
                 tenant_id = $tenant_id, \
                 customer_id = $customer_id, \
                 amount = $amount, \
                 due_date = $due_date, \
                 status = $status, \
                 pix_qr_code = $pix_qr_code, \
                 pix_copy_paste = $pix_copy_paste, \
                 notes = $notes, \
                 paid_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("customer_id", input.customer_id.to_string()))
            .bind(("amount", input.amount))
            .bind(("due_date", date_to_datetime(input.due_date)))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("pix_qr_code", input.pix_qr_code))
            .bind(("pix_copy_paste", input.pix_copy_paste))
            .bind(("notes", input.notes))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ChargeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("charge", &id_str))?;

        Ok(row.into_charge(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<Charge> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('charge', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChargeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("charge", id_str))?;

        Ok(row.into_charge(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateCharge,
    ) -> DunningResult<Charge> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.amount.is_some() {
            sets.push("amount = $amount");
        }
        if input.due_date.is_some() {
            sets.push("due_date = $due_date");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.pix_qr_code.is_some() {
            sets.push("pix_qr_code = $pix_qr_code");
        }
        if input.pix_copy_paste.is_some() {
            sets.push("pix_copy_paste = $pix_copy_paste");
        }
        if input.notes.is_some() {
            sets.push("notes = $notes");
        }
        if input.paid_at.is_some() {
            sets.push("paid_at = $paid_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('charge', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));
        if let Some(amount) = input.amount {
            builder = builder.bind(("amount", amount));
        }
        if let Some(due_date) = input.due_date {
            builder = builder.bind(("due_date", date_to_datetime(due_date)));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(pix_qr_code) = input.pix_qr_code {
            builder = builder.bind(("pix_qr_code", pix_qr_code));
        }
        if let Some(pix_copy_paste) = input.pix_copy_paste {
            builder = builder.bind(("pix_copy_paste", pix_copy_paste));
        }
        if let Some(notes) = input.notes {
            builder = builder.bind(("notes", notes));
        }
        if let Some(paid_at) = input.paid_at {
            builder = builder.bind(("paid_at", paid_at));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ChargeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("charge", id_str))?;

        Ok(row.into_charge(id)?)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: ChargeFilter,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<Charge>> {
        let totals = self.aggregate(tenant_id, &filter).await?;
        let items = self.fetch(tenant_id, &filter, Some(pagination)).await?;

        Ok(PaginatedResult {
            items,
            total: totals.count,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_all(
        &self,
        tenant_id: Uuid,
        filter: ChargeFilter,
    ) -> DunningResult<Vec<Charge>> {
        Ok(self.fetch(tenant_id, &filter, None).await?)
    }

    async fn totals(
        &self,
        tenant_id: Uuid,
        filter: ChargeFilter,
    ) -> DunningResult<ChargeTotals> {
        Ok(self.aggregate(tenant_id, &filter).await?)
    }

    async fn recent_for_customer(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        limit: u64,
    ) -> DunningResult<Vec<Charge>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM charge \
                 WHERE tenant_id = $tenant_id AND customer_id = $customer_id \
                 ORDER BY due_date DESC LIMIT $limit",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("customer_id", customer_id.to_string()))
            .bind(("limit", limit))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChargeRowWithId> = result.take(0).map_err(DbError::from)?;
        let charges = rows
            .into_iter()
            .map(|row| row.try_into_charge())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(charges)
    }

    async fn mark_overdue(&self, tenant_id: Uuid, today: NaiveDate) -> DunningResult<u64> {
        let mut result = self
            .db
            .query(
                "UPDATE charge SET status = 'OVERDUE', updated_at = time::now() \
                 WHERE tenant_id = $tenant_id AND status = 'PENDING' \
                 AND due_date < $today",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("today", date_to_datetime(today)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ChargeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }
}
