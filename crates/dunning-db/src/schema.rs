//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings and enums as uppercase strings with ASSERT constraints.
//! Dates without a time of day are stored as midnight UTC.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string \
    ASSERT string::len($value) > 0 AND $value = string::lowercase($value);
DEFINE FIELD active ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD config ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD integration_token_id ON TABLE tenant TYPE option<string>;
DEFINE FIELD integration_token_hash ON TABLE tenant TYPE option<string>;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;
DEFINE INDEX idx_tenant_integration_token ON TABLE tenant \
    COLUMNS integration_token_id;

-- =======================================================================
-- Users (tenant-scoped; super-administrators have no tenant)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE option<string>;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['ADMIN', 'USER'];
DEFINE FIELD is_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email;

-- =======================================================================
-- Refresh tokens (global scope, keyed by SHA-256 digest)
-- =======================================================================
DEFINE TABLE refresh_token SCHEMAFULL;
DEFINE FIELD user_id ON TABLE refresh_token TYPE string;
DEFINE FIELD token_hash ON TABLE refresh_token TYPE string;
DEFINE FIELD expires_at ON TABLE refresh_token TYPE datetime;
DEFINE FIELD created_at ON TABLE refresh_token TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_refresh_token_hash ON TABLE refresh_token \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_refresh_token_user ON TABLE refresh_token \
    COLUMNS user_id;

-- =======================================================================
-- Customers (tenant-scoped)
-- =======================================================================
DEFINE TABLE customer SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE customer TYPE string;
DEFINE FIELD name ON TABLE customer TYPE string;
DEFINE FIELD phone ON TABLE customer TYPE string;
DEFINE FIELD amount ON TABLE customer TYPE float ASSERT $value > 0;
DEFINE FIELD due_day ON TABLE customer TYPE int \
    ASSERT $value >= 1 AND $value <= 31;
DEFINE FIELD notes ON TABLE customer TYPE option<string>;
DEFINE FIELD active ON TABLE customer TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_customer_tenant_phone ON TABLE customer \
    COLUMNS tenant_id, phone;

-- =======================================================================
-- Charges (tenant-scoped)
-- =======================================================================
DEFINE TABLE charge SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE charge TYPE string;
DEFINE FIELD customer_id ON TABLE charge TYPE string;
DEFINE FIELD amount ON TABLE charge TYPE float ASSERT $value > 0;
DEFINE FIELD due_date ON TABLE charge TYPE datetime;
DEFINE FIELD status ON TABLE charge TYPE string \
    ASSERT $value IN ['PENDING', 'PAID', 'OVERDUE'];
DEFINE FIELD pix_qr_code ON TABLE charge TYPE option<string>;
DEFINE FIELD pix_copy_paste ON TABLE charge TYPE option<string>;
DEFINE FIELD notes ON TABLE charge TYPE option<string>;
DEFINE FIELD paid_at ON TABLE charge TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE charge TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE charge TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_charge_tenant_due ON TABLE charge \
    COLUMNS tenant_id, due_date;
DEFINE INDEX idx_charge_tenant_customer ON TABLE charge \
    COLUMNS tenant_id, customer_id;

-- =======================================================================
-- Messages (tenant-scoped payment reminders)
-- =======================================================================
DEFINE TABLE message SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE message TYPE string;
DEFINE FIELD customer_id ON TABLE message TYPE string;
DEFINE FIELD charge_id ON TABLE message TYPE option<string>;
DEFINE FIELD phone ON TABLE message TYPE string;
DEFINE FIELD body ON TABLE message TYPE string;
DEFINE FIELD status ON TABLE message TYPE string \
    ASSERT $value IN ['SCHEDULED', 'SENT', 'FAILED', 'CANCELLED'];
DEFINE FIELD scheduled_at ON TABLE message TYPE option<datetime>;
DEFINE FIELD sent_at ON TABLE message TYPE option<datetime>;
DEFINE FIELD error ON TABLE message TYPE option<string>;
DEFINE FIELD attempts ON TABLE message TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE message TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE message TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_message_tenant_created ON TABLE message \
    COLUMNS tenant_id, created_at;
DEFINE INDEX idx_message_charge ON TABLE message COLUMNS charge_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_defines_every_table() {
        for table in ["tenant", "user", "refresh_token", "customer", "charge", "message"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
