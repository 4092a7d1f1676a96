//! SurrealDB implementation of [`UserRepository`].
//!
//! Passwords arrive already hashed; this layer never sees plaintext.

use chrono::{DateTime, Utc};
use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::user::{CreateUser, Role, UpdateUser, User};
use dunning_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserRow {
    tenant_id: Option<String>,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_admin: bool,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    tenant_id: Option<String>,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_admin: bool,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    Role::parse(s).ok_or_else(|| DbError::Corrupt(format!("unknown user role: {s}")))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            tenant_id: parse_opt_uuid(self.tenant_id, "tenant")?,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            role: parse_role(&self.role)?,
            is_admin: self.is_admin,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid(&self.record_id, "user")?;
        UserRow {
            tenant_id: self.tenant_id,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            role: self.role,
            is_admin: self.is_admin,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_user(id)
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_one_by_id(
        &self,
        query: &str,
        id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> DunningResult<Option<User>> {
        let mut result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.map(|t| t.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_user(id)?)),
            None => Ok(None),
        }
    }

    async fn select_first(
        &self,
        condition: &str,
        tenant_id: Option<Uuid>,
        email: Option<&str>,
    ) -> DunningResult<Option<User>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE {condition} ORDER BY created_at ASC LIMIT 1"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("tenant_id", tenant_id.map(|t| t.to_string())))
            .bind(("email", email.map(str::to_string)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_user()?)),
            None => Ok(None),
        }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> DunningResult<User> {
        if !input.is_admin && input.tenant_id.is_none() {
            return Err(DunningError::validation(
                "only super-administrators may exist without a tenant",
            ));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 tenant_id = $tenant_id, \
                 email = $email, \
                 password_hash = $password_hash, \
                 name = $name, \
                 role = $role, \
                 is_admin = $is_admin, \
                 active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("name", input.name))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("is_admin", input.is_admin))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "user", "email"))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DunningResult<User> {
        self.select_one_by_id("SELECT * FROM type::record('user', $id)", id, None)
            .await?
            .ok_or_else(|| DunningError::not_found("user", id))
    }

    async fn get_active_by_email(&self, email: &str) -> DunningResult<User> {
        self.select_first("email = $email AND active = true", None, Some(email))
            .await?
            .ok_or_else(|| DunningError::not_found("user", format!("email={email}")))
    }

    async fn get_active_in_scope(&self, id: Uuid, tenant_id: Option<Uuid>) -> DunningResult<User> {
        // A missing tenant must match only tenant-less rows, never "any tenant".
        let query = match tenant_id {
            Some(_) => {
                "SELECT * FROM type::record('user', $id) \
                 WHERE active = true AND tenant_id = $tenant_id"
            }
            None => {
                "SELECT * FROM type::record('user', $id) \
                 WHERE active = true AND tenant_id = NONE"
            }
        };
        self.select_one_by_id(query, id, tenant_id)
            .await?
            .ok_or_else(|| DunningError::not_found("user", id))
    }

    async fn find_by_email_in_tenant(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> DunningResult<Option<User>> {
        self.select_first(
            "tenant_id = $tenant_id AND email = $email",
            Some(tenant_id),
            Some(email),
        )
        .await
    }

    async fn find_tenant_admin(&self, tenant_id: Uuid) -> DunningResult<Option<User>> {
        self.select_first("tenant_id = $tenant_id AND role = 'ADMIN'", Some(tenant_id), None)
            .await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> DunningResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "user", "email"))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.into_user(id)?)
    }
}
