//! SurrealDB implementation of [`CustomerRepository`].

use chrono::{DateTime, Utc};
use dunning_core::error::DunningResult;
use dunning_core::models::customer::{CreateCustomer, Customer, CustomerFilter, UpdateCustomer};
use dunning_core::repository::{CustomerRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, first_total, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CustomerRow {
    tenant_id: String,
    name: String,
    phone: String,
    amount: f64,
    due_day: u32,
    notes: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CustomerRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    phone: String,
    amount: f64,
    due_day: u32,
    notes: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

fn due_day(raw: u32) -> Result<u8, DbError> {
    u8::try_from(raw).map_err(|_| DbError::Corrupt(format!("due day out of range: {raw}")))
}

impl CustomerRow {
    fn into_customer(self, id: Uuid) -> Result<Customer, DbError> {
        Ok(Customer {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            phone: self.phone,
            amount: self.amount,
            due_day: due_day(self.due_day)?,
            notes: self.notes,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl CustomerRowWithId {
    fn try_into_customer(self) -> Result<Customer, DbError> {
        let id = parse_uuid(&self.record_id, "customer")?;
        CustomerRow {
            tenant_id: self.tenant_id,
            name: self.name,
            phone: self.phone,
            amount: self.amount,
            due_day: self.due_day,
            notes: self.notes,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_customer(id)
    }
}

fn collect(rows: Vec<CustomerRowWithId>) -> Result<Vec<Customer>, DbError> {
    rows.into_iter().map(|row| row.try_into_customer()).collect()
}

/// SurrealDB implementation of the Customer repository.
#[derive(Clone)]
pub struct SurrealCustomerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCustomerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CustomerRepository for SurrealCustomerRepository<C> {
    async fn create(&self, tenant_id: Uuid, input: CreateCustomer) -> DunningResult<Customer> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('customer', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, phone = $phone, \
                 amount = $amount, due_day = $due_day, \
                 notes = $notes, active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("phone", input.phone))
            .bind(("amount", input.amount))
            .bind(("due_day", u32::from(input.due_day)))
            .bind(("notes", input.notes))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "customer", "phone"))?;

        let rows: Vec<CustomerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("customer", &id_str))?;

        Ok(row.into_customer(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<Customer> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('customer', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustomerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("customer", id_str))?;

        Ok(row.into_customer(id)?)
    }

    async fn get_many(&self, tenant_id: Uuid, ids: &[Uuid]) -> DunningResult<Vec<Customer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM customer \
                 WHERE tenant_id = $tenant_id AND meta::id(id) INSIDE $ids",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("ids", ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustomerRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }

    async fn find_active_by_phone(
        &self,
        tenant_id: Uuid,
        phone: &str,
        exclude: Option<Uuid>,
    ) -> DunningResult<Option<Customer>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM customer \
                 WHERE tenant_id = $tenant_id AND phone = $phone \
                 AND active = true AND meta::id(id) != $exclude \
                 LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("phone", phone.to_string()))
            .bind(("exclude", exclude.map(|id| id.to_string()).unwrap_or_default()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustomerRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?.into_iter().next())
    }

    async fn search_ids_by_name(
        &self,
        tenant_id: Uuid,
        search: &str,
    ) -> DunningResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM customer \
                 WHERE tenant_id = $tenant_id \
                 AND string::contains(string::lowercase(name), $search)",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("search", search.to_lowercase()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        let ids = rows
            .iter()
            .map(|row| parse_uuid(&row.record_id, "customer"))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(ids)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateCustomer,
    ) -> DunningResult<Customer> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.amount.is_some() {
            sets.push("amount = $amount");
        }
        if input.due_day.is_some() {
            sets.push("due_day = $due_day");
        }
        if input.notes.is_some() {
            sets.push("notes = $notes");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('customer', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(amount) = input.amount {
            builder = builder.bind(("amount", amount));
        }
        if let Some(due_day) = input.due_day {
            builder = builder.bind(("due_day", u32::from(due_day)));
        }
        if let Some(notes) = input.notes {
            builder = builder.bind(("notes", notes));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "customer", "phone"))?;

        let rows: Vec<CustomerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("customer", id_str))?;

        Ok(row.into_customer(id)?)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: CustomerFilter,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<Customer>> {
        let mut conditions = vec!["tenant_id = $tenant_id"];
        if filter.active.is_some() {
            conditions.push("active = $active");
        }
        if filter.search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(name), $search) \
                 OR string::contains(string::lowercase(phone), $search))",
            );
        }
        let where_clause = conditions.join(" AND ");
        let search = filter.search.map(|s| s.to_lowercase());

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM customer WHERE {where_clause} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM customer \
                 WHERE {where_clause} \
                 ORDER BY {} {} \
                 LIMIT $limit START $offset",
                filter.sort_by.column(),
                filter.sort_order.keyword(),
            ))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("active", filter.active))
            .bind(("search", search))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<CustomerRowWithId> = result.take(1).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: collect(rows)?,
            total: first_total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
