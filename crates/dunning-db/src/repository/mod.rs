//! SurrealDB repository implementations.

mod charge;
mod customer;
mod message;
mod refresh_token;
mod tenant;
mod user;

pub use charge::SurrealChargeRepository;
pub use customer::SurrealCustomerRepository;
pub use message::SurrealMessageRepository;
pub use refresh_token::SurrealRefreshTokenRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Corrupt(format!("invalid {what} UUID: {e}")))
}

fn parse_opt_uuid(raw: Option<String>, what: &str) -> Result<Option<Uuid>, DbError> {
    raw.as_deref().map(|s| parse_uuid(s, what)).transpose()
}

/// Calendar dates are stored as midnight UTC.
fn date_to_datetime(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn first_total(rows: Vec<CountRow>) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}
