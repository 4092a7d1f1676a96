//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use dunning_core::error::DunningResult;
use dunning_core::models::tenant::{
    CreateTenant, IntegrationCredential, Tenant, TenantCounts, TenantFilter, UpdateTenant,
};
use dunning_core::repository::{PaginatedResult, Pagination, TenantRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use super::{CountRow, first_total, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TenantRow {
    name: String,
    slug: String,
    active: bool,
    config: serde_json::Value,
    integration_token_id: Option<String>,
    integration_token_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    name: String,
    slug: String,
    active: bool,
    config: serde_json::Value,
    integration_token_id: Option<String>,
    integration_token_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Only a complete pair counts as a token. A half-written pair is
/// logged and treated as no token at all.
fn credential(
    tenant_id: Uuid,
    token_id: Option<String>,
    token_hash: Option<String>,
) -> Option<IntegrationCredential> {
    match (token_id, token_hash) {
        (Some(token_id), Some(token_hash)) => Some(IntegrationCredential {
            token_id,
            token_hash,
        }),
        (None, None) => None,
        _ => {
            warn!(%tenant_id, "Tenant holds an incomplete integration token pair");
            None
        }
    }
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Tenant {
        Tenant {
            id,
            name: self.name,
            slug: self.slug,
            active: self.active,
            config: self.config,
            integration_token: credential(
                id,
                self.integration_token_id,
                self.integration_token_hash,
            ),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = parse_uuid(&self.record_id, "tenant")?;
        Ok(TenantRow {
            name: self.name,
            slug: self.slug,
            active: self.active,
            config: self.config,
            integration_token_id: self.integration_token_id,
            integration_token_hash: self.integration_token_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_tenant(id))
    }
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(&self, condition: &str, key: &str, value: String) -> DunningResult<Tenant> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM tenant WHERE {condition} LIMIT 1"
        );
        let mut result = self
            .db
            .query(&query)
            .bind((key.to_string(), value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", format!("{key}={value}")))?;

        Ok(row.try_into_tenant()?)
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> DunningResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let config = input
            .config
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 name = $name, slug = $slug, active = true, \
                 config = $config, \
                 integration_token_id = NONE, \
                 integration_token_hash = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("config", config))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "tenant", "slug"))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", &id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn get_by_id(&self, id: Uuid) -> DunningResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn get_by_slug(&self, slug: &str) -> DunningResult<Tenant> {
        self.find_one("slug = $slug", "slug", slug.to_string())
            .await
    }

    async fn get_active_by_integration_token_id(&self, token_id: &str) -> DunningResult<Tenant> {
        self.find_one(
            "integration_token_id = $token_id AND active = true",
            "token_id",
            token_id.to_string(),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> DunningResult<Tenant> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.slug.is_some() {
            sets.push("slug = $slug");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        if input.config.is_some() {
            sets.push("config = $config");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(slug) = input.slug {
            builder = builder.bind(("slug", slug));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }
        if let Some(config) = input.config {
            builder = builder.bind(("config", config));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "tenant", "slug"))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn set_integration_token(
        &self,
        id: Uuid,
        credential: Option<IntegrationCredential>,
    ) -> DunningResult<Tenant> {
        let id_str = id.to_string();
        let (token_id, token_hash) = match credential {
            Some(c) => (Some(c.token_id), Some(c.token_hash)),
            None => (None, None),
        };

        let result = self
            .db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 integration_token_id = $token_id, \
                 integration_token_hash = $token_hash, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("token_id", token_id))
            .bind(("token_hash", token_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn delete(&self, id: Uuid) -> DunningResult<()> {
        self.db
            .query("DELETE type::record('tenant', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: TenantFilter,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<Tenant>> {
        let mut conditions = vec!["true"];
        if filter.active.is_some() {
            conditions.push("active = $active");
        }
        if filter.search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(name), $search) \
                 OR string::contains(slug, $search))",
            );
        }
        let where_clause = conditions.join(" AND ");
        let search = filter.search.map(|s| s.to_lowercase());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM tenant WHERE {where_clause} GROUP ALL"
            ))
            .bind(("active", filter.active))
            .bind(("search", search.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_total(count_rows);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE {where_clause} \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset"
            ))
            .bind(("active", filter.active))
            .bind(("search", search))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn counts(&self, id: Uuid) -> DunningResult<TenantCounts> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT count() AS total FROM customer WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT count() AS total FROM charge WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT count() AS total FROM message WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let users: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let customers: Vec<CountRow> = result.take(1).map_err(DbError::from)?;
        let charges: Vec<CountRow> = result.take(2).map_err(DbError::from)?;
        let messages: Vec<CountRow> = result.take(3).map_err(DbError::from)?;

        Ok(TenantCounts {
            users: first_total(users),
            customers: first_total(customers),
            charges: first_total(charges),
            messages: first_total(messages),
        })
    }
}
