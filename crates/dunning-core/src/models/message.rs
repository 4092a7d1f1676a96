//! Payment-reminder message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    #[default]
    Scheduled,
    Sent,
    Failed,
    Cancelled,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Scheduled => "SCHEDULED",
            MessageStatus::Sent => "SENT",
            MessageStatus::Failed => "FAILED",
            MessageStatus::Cancelled => "CANCELLED",
        }
    }

    /// Strict parse of a stored or filtered status.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Some(MessageStatus::Scheduled),
            "SENT" => Some(MessageStatus::Sent),
            "FAILED" => Some(MessageStatus::Failed),
            "CANCELLED" => Some(MessageStatus::Cancelled),
            _ => None,
        }
    }

    /// Lenient parse used when an integration creates a message.
    ///
    /// Charge statuses are accepted too: an open charge schedules a
    /// reminder and a paid one records it as sent. Anything else falls
    /// back to scheduled.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        let Some(raw) = s else {
            return MessageStatus::Scheduled;
        };
        if let Some(status) = Self::parse(raw) {
            return status;
        }
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAID" => MessageStatus::Sent,
            _ => MessageStatus::Scheduled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub charge_id: Option<Uuid>,
    pub phone: String,
    pub body: String,
    pub status: MessageStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub customer_id: Uuid,
    pub charge_id: Option<Uuid>,
    pub phone: String,
    pub body: String,
    pub status: MessageStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// `Some(None)` clears a nullable field, `None` leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateMessage {
    pub status: Option<MessageStatus>,
    pub sent_at: Option<Option<DateTime<Utc>>>,
    pub error: Option<Option<String>>,
    pub attempts: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub status: Option<MessageStatus>,
    pub customer_id: Option<Uuid>,
    pub charge_id: Option<Uuid>,
    /// Substring match on body or phone.
    pub search: Option<String>,
    /// Customers whose name matched `search`; their messages match too.
    pub search_customer_ids: Vec<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
}
