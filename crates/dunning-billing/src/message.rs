//! Payment-reminder messages.
//!
//! Messages are recorded by an external sender (usually through the
//! integration token) and tracked here; nothing is sent from this
//! process.

use chrono::{DateTime, NaiveDate, Utc};
use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::charge::{Charge, ChargeStatus};
use dunning_core::models::customer::CustomerSummary;
use dunning_core::models::message::{
    CreateMessage, Message, MessageFilter, MessageStatus, UpdateMessage,
};
use dunning_core::repository::{
    ChargeRepository, CustomerRepository, MessageRepository, PaginatedResult, Pagination,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::calendar;

/// Longest delivery error kept on a message.
pub const MAX_ERROR_LEN: usize = 5000;

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub customer_id: Uuid,
    pub charge_id: Option<Uuid>,
    pub phone: String,
    pub body: String,
    /// Free-form status; see [`MessageStatus::parse_lenient`].
    pub status: Option<String>,
    /// ISO 8601 or `dd/MM/yyyy[ HH:mm[:ss]]`.
    pub scheduled_at: Option<String>,
}

/// Outer `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct MessageChanges {
    pub status: Option<MessageStatus>,
    pub sent_at: Option<Option<String>>,
    pub error: Option<Option<String>>,
    pub attempts: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub status: Option<MessageStatus>,
    pub customer_id: Option<Uuid>,
    pub charge_id: Option<Uuid>,
    /// Matches body, phone or customer name.
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeBrief {
    pub id: Uuid,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: ChargeStatus,
    pub pix_copy_paste: Option<String>,
}

impl From<Charge> for ChargeBrief {
    fn from(charge: Charge) -> Self {
        Self {
            id: charge.id,
            amount: charge.amount,
            due_date: charge.due_date,
            status: charge.status,
            pix_copy_paste: charge.pix_copy_paste,
        }
    }
}

/// A message with the customer and charge it refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub customer: Option<CustomerSummary>,
    pub charge: Option<ChargeBrief>,
}

pub struct MessageService<M: MessageRepository, C: CustomerRepository, H: ChargeRepository> {
    message_repo: M,
    customer_repo: C,
    charge_repo: H,
}

impl<M, C, H> MessageService<M, C, H>
where
    M: MessageRepository,
    C: CustomerRepository,
    H: ChargeRepository,
{
    pub fn new(message_repo: M, customer_repo: C, charge_repo: H) -> Self {
        Self {
            message_repo,
            customer_repo,
            charge_repo,
        }
    }

    pub async fn create(&self, tenant_id: Uuid, input: NewMessage) -> DunningResult<MessageView> {
        let customer = match self
            .customer_repo
            .get_by_id(tenant_id, input.customer_id)
            .await
        {
            Ok(c) if c.active => c,
            Ok(_) | Err(DunningError::NotFound { .. }) => {
                return Err(DunningError::not_found("customer", input.customer_id));
            }
            Err(e) => return Err(e),
        };

        let charge = match input.charge_id {
            Some(charge_id) => Some(self.charge_of(tenant_id, charge_id, customer.id).await?),
            None => None,
        };

        let scheduled_at = match input.scheduled_at.as_deref() {
            Some(raw) => calendar::parse_flexible_datetime(raw)?,
            None => None,
        };

        let message = self
            .message_repo
            .create(
                tenant_id,
                CreateMessage {
                    customer_id: customer.id,
                    charge_id: charge.as_ref().map(|c| c.id),
                    phone: input.phone,
                    body: input.body,
                    status: MessageStatus::parse_lenient(input.status.as_deref()),
                    scheduled_at,
                },
            )
            .await?;

        info!(%tenant_id, message_id = %message.id, status = message.status.as_str(), "Message recorded");
        Ok(MessageView {
            message,
            customer: Some(customer.summary()),
            charge: charge.map(ChargeBrief::from),
        })
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        query: MessageQuery,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<MessageView>> {
        let search = query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let search_customer_ids = match search.as_deref() {
            Some(term) => {
                self.customer_repo
                    .search_ids_by_name(tenant_id, term)
                    .await?
            }
            None => Vec::new(),
        };

        let filter = MessageFilter {
            status: query.status,
            customer_id: query.customer_id,
            charge_id: query.charge_id,
            search,
            search_customer_ids,
            created_from: query.from,
            created_until: query.to,
        };

        let page = self.message_repo.list(tenant_id, filter, pagination).await?;
        let mut items = Vec::with_capacity(page.items.len());
        for message in page.items {
            items.push(self.view(tenant_id, message).await?);
        }
        Ok(PaginatedResult {
            items,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<MessageView> {
        let message = self.message_repo.get_by_id(tenant_id, id).await?;
        self.view(tenant_id, message).await
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: MessageChanges,
    ) -> DunningResult<MessageView> {
        if let Some(Some(error)) = &changes.error {
            if error.chars().count() > MAX_ERROR_LEN {
                return Err(DunningError::validation(format!(
                    "error must be at most {MAX_ERROR_LEN} characters"
                )));
            }
        }
        let sent_at = match changes.sent_at {
            Some(Some(raw)) => Some(calendar::parse_flexible_datetime(&raw)?),
            Some(None) => Some(None),
            None => None,
        };

        let message = self
            .message_repo
            .update(
                tenant_id,
                id,
                UpdateMessage {
                    status: changes.status,
                    sent_at,
                    error: changes.error,
                    attempts: changes.attempts,
                },
            )
            .await?;
        self.view(tenant_id, message).await
    }

    /// The charge, which must belong to `customer_id`.
    async fn charge_of(
        &self,
        tenant_id: Uuid,
        charge_id: Uuid,
        customer_id: Uuid,
    ) -> DunningResult<Charge> {
        let mismatch =
            || DunningError::validation("charge not found or not owned by the given customer");
        match self.charge_repo.get_by_id(tenant_id, charge_id).await {
            Ok(charge) if charge.customer_id == customer_id => Ok(charge),
            Ok(_) | Err(DunningError::NotFound { .. }) => Err(mismatch()),
            Err(e) => Err(e),
        }
    }

    async fn view(&self, tenant_id: Uuid, message: Message) -> DunningResult<MessageView> {
        let customer = match self
            .customer_repo
            .get_by_id(tenant_id, message.customer_id)
            .await
        {
            Ok(c) => Some(c.summary()),
            Err(DunningError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        let charge = match message.charge_id {
            Some(charge_id) => match self.charge_repo.get_by_id(tenant_id, charge_id).await {
                Ok(c) => Some(ChargeBrief::from(c)),
                Err(DunningError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        Ok(MessageView {
            message,
            customer,
            charge,
        })
    }
}
