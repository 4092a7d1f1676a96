//! Charge domain model and status derivation.
//!
//! A charge is one amount owed by a customer on a due date. Its status
//! is derived from the due date relative to "today" (UTC, day
//! granularity) until it is paid.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargeStatus {
    Pending,
    Paid,
    Overdue,
}

impl ChargeStatus {
    /// Statuses of charges that still await payment.
    pub const OPEN: [ChargeStatus; 2] = [ChargeStatus::Pending, ChargeStatus::Overdue];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "PENDING",
            ChargeStatus::Paid => "PAID",
            ChargeStatus::Overdue => "OVERDUE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(ChargeStatus::Pending),
            "PAID" => Some(ChargeStatus::Paid),
            "OVERDUE" => Some(ChargeStatus::Overdue),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, ChargeStatus::Paid)
    }

    /// Status of a new charge: overdue when its due date already passed.
    pub fn for_due_date(due_date: NaiveDate, today: NaiveDate) -> Self {
        if due_date < today {
            ChargeStatus::Overdue
        } else {
            ChargeStatus::Pending
        }
    }

    /// Status after an update.
    ///
    /// The requested status (or the current one) is kept unless the
    /// due date moves; a moved due date re-derives the status of an
    /// unpaid charge. A charge that is paid stays paid when its date
    /// moves into the past.
    pub fn after_update(
        current: ChargeStatus,
        requested: Option<ChargeStatus>,
        new_due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let status = requested.unwrap_or(current);
        match new_due_date {
            Some(due) if due < today && current != ChargeStatus::Paid => ChargeStatus::Overdue,
            Some(due) if due >= today && status != ChargeStatus::Paid => ChargeStatus::Pending,
            _ => status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: ChargeStatus,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCharge {
    pub customer_id: Uuid,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: ChargeStatus,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCharge {
    pub amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<ChargeStatus>,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Selection over a tenant's charges. Unset fields do not filter.
///
/// Date bounds are half-open: `*_from` inclusive, `*_before` exclusive.
#[derive(Debug, Clone, Default)]
pub struct ChargeFilter {
    /// Empty means any status.
    pub statuses: Vec<ChargeStatus>,
    pub customer_id: Option<Uuid>,
    pub due_from: Option<NaiveDate>,
    pub due_before: Option<NaiveDate>,
    pub paid_from: Option<DateTime<Utc>>,
    pub paid_before: Option<DateTime<Utc>>,
}

impl ChargeFilter {
    pub fn open() -> Self {
        Self {
            statuses: ChargeStatus::OPEN.to_vec(),
            ..Default::default()
        }
    }

    pub fn due_between(mut self, from: NaiveDate, before: NaiveDate) -> Self {
        self.due_from = Some(from);
        self.due_before = Some(before);
        self
    }
}

/// Sum and count over a charge selection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChargeTotals {
    pub amount: f64,
    pub count: u64,
}
