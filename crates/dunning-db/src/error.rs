//! Database-specific error types and conversions.

use dunning_core::error::DunningError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated: {entity}.{field}")]
    Conflict { entity: String, field: String },

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Classify a failed write. A unique index violation becomes a
    /// [`DbError::Conflict`] on the given field.
    pub(crate) fn from_write(err: surrealdb::Error, entity: &str, field: &str) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Conflict {
                entity: entity.into(),
                field: field.into(),
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for DunningError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => DunningError::NotFound { entity, id },
            DbError::Conflict { entity, field } => DunningError::AlreadyExists { entity, field },
            other => DunningError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_already_exists() {
        let err: DunningError = DbError::Conflict {
            entity: "tenant".into(),
            field: "slug".into(),
        }
        .into();
        assert!(matches!(
            err,
            DunningError::AlreadyExists { ref entity, ref field } if entity == "tenant" && field == "slug"
        ));
    }

    #[test]
    fn corrupt_rows_are_database_errors() {
        let err: DunningError = DbError::Corrupt("bad uuid".into()).into();
        assert!(matches!(err, DunningError::Database(_)));
    }
}
