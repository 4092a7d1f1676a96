//! Monthly collection statistics.

use chrono::NaiveDate;
use dunning_core::error::DunningResult;
use dunning_core::models::charge::{ChargeFilter, ChargeStatus};
use dunning_core::repository::ChargeRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::calendar;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Open charges due in the month.
    pub total_receivable: f64,
    /// Charges paid during the month.
    pub total_received: f64,
    /// All OVERDUE charges, regardless of month.
    pub total_overdue: f64,
    pub overdue_count: u64,
    /// Share of the month's charges already paid, 0..=100.
    pub payment_rate: f64,
    pub month: u32,
    pub year: i32,
}

pub struct DashboardService<H: ChargeRepository> {
    charge_repo: H,
}

impl<H: ChargeRepository> DashboardService<H> {
    pub fn new(charge_repo: H) -> Self {
        Self { charge_repo }
    }

    pub async fn stats(
        &self,
        tenant_id: Uuid,
        month: Option<u32>,
        year: Option<i32>,
    ) -> DunningResult<DashboardStats> {
        self.stats_at(tenant_id, month, year, calendar::today()).await
    }

    /// [`stats`](Self::stats) as seen on `today`.
    pub async fn stats_at(
        &self,
        tenant_id: Uuid,
        month: Option<u32>,
        year: Option<i32>,
        today: NaiveDate,
    ) -> DunningResult<DashboardStats> {
        self.charge_repo.mark_overdue(tenant_id, today).await?;

        let (month, year) = calendar::resolve_month(month, year, today);
        let (start, end) = calendar::month_bounds(month, year)?;
        let in_month = |statuses: &[ChargeStatus]| ChargeFilter {
            statuses: statuses.to_vec(),
            ..Default::default()
        }
        .due_between(start, end);

        let receivable = self
            .charge_repo
            .totals(tenant_id, in_month(&ChargeStatus::OPEN))
            .await?;
        let received = self
            .charge_repo
            .totals(
                tenant_id,
                ChargeFilter {
                    statuses: vec![ChargeStatus::Paid],
                    paid_from: Some(calendar::start_of_day(start)),
                    paid_before: Some(calendar::start_of_day(end)),
                    ..Default::default()
                },
            )
            .await?;
        let overdue = self
            .charge_repo
            .totals(
                tenant_id,
                ChargeFilter {
                    statuses: vec![ChargeStatus::Overdue],
                    ..Default::default()
                },
            )
            .await?;
        let due_in_month = self.charge_repo.totals(tenant_id, in_month(&[])).await?;
        let paid_in_month = self
            .charge_repo
            .totals(tenant_id, in_month(&[ChargeStatus::Paid]))
            .await?;

        Ok(DashboardStats {
            total_receivable: round2(receivable.amount),
            total_received: round2(received.amount),
            total_overdue: round2(overdue.amount),
            overdue_count: overdue.count,
            payment_rate: payment_rate(paid_in_month.count, due_in_month.count),
            month,
            year,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn payment_rate(paid: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(paid as f64 / total as f64 * 100.0)
    }
}
