//! Charges: status derivation, payment, listings and the situational
//! summary consumed by reminder integrations.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::charge::{
    Charge, ChargeFilter, ChargeStatus, CreateCharge, UpdateCharge,
};
use dunning_core::models::customer::CustomerSummary;
use dunning_core::models::message::MessageStatus;
use dunning_core::repository::{
    ChargeRepository, CustomerRepository, MessageRepository, PaginatedResult, Pagination,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar;
use crate::customer::check_amount;

/// Messages attached to each summary item.
const SUMMARY_MESSAGES: u64 = 2;
/// Days after today covered by the "upcoming" bucket.
const UPCOMING_DAYS: i64 = 2;

#[derive(Debug, Clone)]
pub struct NewCharge {
    pub customer_id: Uuid,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChargeChanges {
    pub amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<ChargeStatus>,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub notes: Option<String>,
}

/// Listing filter. Giving either `month` or `year` restricts the due
/// date to that month; the other part defaults to the current one.
#[derive(Debug, Clone, Default)]
pub struct ChargeQuery {
    pub status: Option<ChargeStatus>,
    pub customer_id: Option<Uuid>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// A charge with its customer's contact summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeView {
    #[serde(flatten)]
    pub charge: Charge,
    pub customer: Option<CustomerSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBrief {
    pub id: Uuid,
    pub status: MessageStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryItem {
    #[serde(flatten)]
    pub charge: Charge,
    pub customer: Option<CustomerSummary>,
    pub messages: Vec<MessageBrief>,
}

/// Open charges grouped by how their due date relates to today.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeSummary {
    /// Due tomorrow up to two days from today.
    pub upcoming: Vec<SummaryItem>,
    pub due_today: Vec<SummaryItem>,
    pub overdue: Vec<SummaryItem>,
}

pub struct ChargeService<H: ChargeRepository, C: CustomerRepository, M: MessageRepository> {
    charge_repo: H,
    customer_repo: C,
    message_repo: M,
}

impl<H, C, M> ChargeService<H, C, M>
where
    H: ChargeRepository,
    C: CustomerRepository,
    M: MessageRepository,
{
    pub fn new(charge_repo: H, customer_repo: C, message_repo: M) -> Self {
        Self {
            charge_repo,
            customer_repo,
            message_repo,
        }
    }

    /// Create a charge for an active customer. A due date in the past
    /// makes the charge OVERDUE from the start.
    pub async fn create(&self, tenant_id: Uuid, input: NewCharge) -> DunningResult<ChargeView> {
        check_amount(input.amount)?;
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

        let charge = self
            .charge_repo
            .create(
                tenant_id,
                CreateCharge {
                    customer_id: customer.id,
                    amount: input.amount,
                    due_date: input.due_date,
                    status: ChargeStatus::for_due_date(input.due_date, calendar::today()),
                    pix_qr_code: input.pix_qr_code,
                    pix_copy_paste: input.pix_copy_paste,
                    notes: input.notes,
                },
            )
            .await?;

        info!(%tenant_id, charge_id = %charge.id, status = charge.status.as_str(), "Charge created");
        Ok(ChargeView {
            charge,
            customer: Some(customer.summary()),
        })
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        query: ChargeQuery,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<ChargeView>> {
        let mut filter = ChargeFilter {
            statuses: query.status.into_iter().collect(),
            customer_id: query.customer_id,
            ..Default::default()
        };
        if query.month.is_some() || query.year.is_some() {
            let (month, year) = calendar::resolve_month(query.month, query.year, calendar::today());
            let (from, before) = calendar::month_bounds(month, year)?;
            filter = filter.due_between(from, before);
        }

        let page = self.charge_repo.list(tenant_id, filter, pagination).await?;
        let items = self.with_customers(tenant_id, page.items).await?;
        Ok(PaginatedResult {
            items,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<ChargeView> {
        let charge = self.charge_repo.get_by_id(tenant_id, id).await?;
        self.view(tenant_id, charge).await
    }

    /// Apply changes. Moving the due date of an unpaid charge
    /// re-derives its status from the new date.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: ChargeChanges,
    ) -> DunningResult<ChargeView> {
        if let Some(amount) = changes.amount {
            check_amount(amount)?;
        }
        let existing = self.charge_repo.get_by_id(tenant_id, id).await?;
        let status = ChargeStatus::after_update(
            existing.status,
            changes.status,
            changes.due_date,
            calendar::today(),
        );
        let paid_at = (status == ChargeStatus::Paid && existing.paid_at.is_none())
            .then(Utc::now);

        let charge = self
            .charge_repo
            .update(
                tenant_id,
                id,
                UpdateCharge {
                    amount: changes.amount,
                    due_date: changes.due_date,
                    status: Some(status),
                    pix_qr_code: changes.pix_qr_code,
                    pix_copy_paste: changes.pix_copy_paste,
                    notes: changes.notes,
                    paid_at,
                },
            )
            .await?;
        self.view(tenant_id, charge).await
    }

    pub async fn mark_paid(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<ChargeView> {
        let existing = self.charge_repo.get_by_id(tenant_id, id).await?;
        if existing.status == ChargeStatus::Paid {
            return Err(DunningError::validation("charge is already paid"));
        }

        let charge = self
            .charge_repo
            .update(
                tenant_id,
                id,
                UpdateCharge {
                    status: Some(ChargeStatus::Paid),
                    paid_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        info!(%tenant_id, charge_id = %id, "Charge marked as paid");
        self.view(tenant_id, charge).await
    }

    /// Open charges due today.
    pub async fn due_today(&self, tenant_id: Uuid) -> DunningResult<Vec<ChargeView>> {
        let today = calendar::today();
        let charges = self
            .charge_repo
            .list_all(
                tenant_id,
                ChargeFilter::open().due_between(today, calendar::next_day(today)),
            )
            .await?;
        self.with_customers(tenant_id, charges).await
    }

    /// Open charges due before today.
    pub async fn overdue(&self, tenant_id: Uuid) -> DunningResult<Vec<ChargeView>> {
        let today = calendar::today();
        self.reconcile_at(tenant_id, today).await?;
        let charges = self
            .charge_repo
            .list_all(tenant_id, overdue_filter(today))
            .await?;
        self.with_customers(tenant_id, charges).await
    }

    pub async fn summary(&self, tenant_id: Uuid) -> DunningResult<ChargeSummary> {
        let today = calendar::today();
        self.reconcile_at(tenant_id, today).await?;

        let tomorrow = calendar::next_day(today);
        let upcoming_end = tomorrow + Duration::days(UPCOMING_DAYS);

        let upcoming = ChargeFilter::open().due_between(tomorrow, upcoming_end);
        let due_today = ChargeFilter::open().due_between(today, tomorrow);

        Ok(ChargeSummary {
            upcoming: self.summary_items(tenant_id, upcoming).await?,
            due_today: self.summary_items(tenant_id, due_today).await?,
            overdue: self
                .summary_items(tenant_id, overdue_filter(today))
                .await?,
        })
    }

    /// Flip PENDING charges whose due date has passed to OVERDUE.
    pub async fn reconcile_overdue(&self, tenant_id: Uuid) -> DunningResult<u64> {
        self.reconcile_at(tenant_id, calendar::today()).await
    }

    async fn reconcile_at(&self, tenant_id: Uuid, today: NaiveDate) -> DunningResult<u64> {
        let flipped = self.charge_repo.mark_overdue(tenant_id, today).await?;
        if flipped > 0 {
            debug!(%tenant_id, flipped, "Charges moved to OVERDUE");
        }
        Ok(flipped)
    }

    async fn summary_items(
        &self,
        tenant_id: Uuid,
        filter: ChargeFilter,
    ) -> DunningResult<Vec<SummaryItem>> {
        let charges = self.charge_repo.list_all(tenant_id, filter).await?;
        let views = self.with_customers(tenant_id, charges).await?;

        let mut items = Vec::with_capacity(views.len());
        for view in views {
            let messages = self
                .message_repo
                .recent_for_charge(tenant_id, view.charge.id, SUMMARY_MESSAGES)
                .await?
                .into_iter()
                .map(|m| MessageBrief {
                    id: m.id,
                    status: m.status,
                    sent_at: m.sent_at,
                    scheduled_at: m.scheduled_at,
                    attempts: m.attempts,
                    error: m.error,
                })
                .collect();
            items.push(SummaryItem {
                charge: view.charge,
                customer: view.customer,
                messages,
            });
        }
        Ok(items)
    }

    async fn view(&self, tenant_id: Uuid, charge: Charge) -> DunningResult<ChargeView> {
        let customer = match self
            .customer_repo
            .get_by_id(tenant_id, charge.customer_id)
            .await
        {
            Ok(c) => Some(c.summary()),
            Err(DunningError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok(ChargeView { charge, customer })
    }

    async fn with_customers(
        &self,
        tenant_id: Uuid,
        charges: Vec<Charge>,
    ) -> DunningResult<Vec<ChargeView>> {
        let mut ids: Vec<Uuid> = charges.iter().map(|c| c.customer_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let customers: HashMap<Uuid, CustomerSummary> = self
            .customer_repo
            .get_many(tenant_id, &ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.summary()))
            .collect();

        Ok(charges
            .into_iter()
            .map(|charge| ChargeView {
                customer: customers.get(&charge.customer_id).cloned(),
                charge,
            })
            .collect())
    }
}

fn overdue_filter(today: NaiveDate) -> ChargeFilter {
    ChargeFilter {
        due_before: Some(today),
        ..ChargeFilter::open()
    }
}
