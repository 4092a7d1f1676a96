//! Customer domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Unique among the tenant's active customers.
    pub phone: String,
    /// Recurring amount billed to the customer.
    pub amount: f64,
    /// Day of month (1..=31) the recurring charge falls due.
    pub due_day: u8,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub name: String,
    pub phone: String,
    pub amount: f64,
    pub due_day: u8,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub amount: Option<f64>,
    pub due_day: Option<u8>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CustomerSortField {
    Name,
    Phone,
    Amount,
    DueDay,
    Active,
    #[default]
    CreatedAt,
}

impl CustomerSortField {
    /// Column the field sorts on.
    pub fn column(&self) -> &'static str {
        match self {
            CustomerSortField::Name => "name",
            CustomerSortField::Phone => "phone",
            CustomerSortField::Amount => "amount",
            CustomerSortField::DueDay => "due_day",
            CustomerSortField::Active => "active",
            CustomerSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub active: Option<bool>,
    /// Case-insensitive substring match on name or phone.
    pub search: Option<String>,
    pub sort_by: CustomerSortField,
    pub sort_order: SortOrder,
}
