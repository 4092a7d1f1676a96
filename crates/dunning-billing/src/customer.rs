//! Customer management.

use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::charge::Charge;
use dunning_core::models::customer::{CreateCustomer, Customer, CustomerFilter, UpdateCustomer};
use dunning_core::repository::{ChargeRepository, CustomerRepository, PaginatedResult, Pagination};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Number of charges shown on the customer detail view.
const RECENT_CHARGES: u64 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub recent_charges: Vec<Charge>,
}

pub struct CustomerService<C: CustomerRepository, H: ChargeRepository> {
    customer_repo: C,
    charge_repo: H,
}

impl<C: CustomerRepository, H: ChargeRepository> CustomerService<C, H> {
    pub fn new(customer_repo: C, charge_repo: H) -> Self {
        Self {
            customer_repo,
            charge_repo,
        }
    }

    pub async fn create(&self, tenant_id: Uuid, input: CreateCustomer) -> DunningResult<Customer> {
        check_amount(input.amount)?;
        check_due_day(input.due_day)?;
        self.ensure_phone_free(tenant_id, &input.phone, None).await?;

        let customer = self.customer_repo.create(tenant_id, input).await?;
        info!(%tenant_id, customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: CustomerFilter,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<Customer>> {
        self.customer_repo.list(tenant_id, filter, pagination).await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<CustomerDetail> {
        let customer = self.customer_repo.get_by_id(tenant_id, id).await?;
        let recent_charges = self
            .charge_repo
            .recent_for_customer(tenant_id, id, RECENT_CHARGES)
            .await?;
        Ok(CustomerDetail {
            customer,
            recent_charges,
        })
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateCustomer,
    ) -> DunningResult<Customer> {
        let existing = self.customer_repo.get_by_id(tenant_id, id).await?;
        if let Some(amount) = input.amount {
            check_amount(amount)?;
        }
        if let Some(due_day) = input.due_day {
            check_due_day(due_day)?;
        }
        if let Some(phone) = input.phone.as_deref().filter(|p| *p != existing.phone) {
            self.ensure_phone_free(tenant_id, phone, Some(id)).await?;
        }

        self.customer_repo.update(tenant_id, id, input).await
    }

    /// Reactivate a customer. Fails if another active customer took
    /// its phone number in the meantime.
    pub async fn activate(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<Customer> {
        let customer = self.customer_repo.get_by_id(tenant_id, id).await?;
        if customer.active {
            return Err(DunningError::validation("customer is already active"));
        }
        self.ensure_phone_free(tenant_id, &customer.phone, Some(id))
            .await?;
        self.set_active(tenant_id, id, true).await
    }

    pub async fn deactivate(&self, tenant_id: Uuid, id: Uuid) -> DunningResult<Customer> {
        let customer = self.customer_repo.get_by_id(tenant_id, id).await?;
        if !customer.active {
            return Err(DunningError::validation("customer is already inactive"));
        }
        self.set_active(tenant_id, id, false).await
    }

    async fn set_active(&self, tenant_id: Uuid, id: Uuid, active: bool) -> DunningResult<Customer> {
        let customer = self
            .customer_repo
            .update(
                tenant_id,
                id,
                UpdateCustomer {
                    active: Some(active),
                    ..Default::default()
                },
            )
            .await?;
        info!(%tenant_id, customer_id = %id, active, "Customer activation changed");
        Ok(customer)
    }

    async fn ensure_phone_free(
        &self,
        tenant_id: Uuid,
        phone: &str,
        exclude: Option<Uuid>,
    ) -> DunningResult<()> {
        match self
            .customer_repo
            .find_active_by_phone(tenant_id, phone, exclude)
            .await?
        {
            Some(_) => Err(DunningError::already_exists("customer", "phone")),
            None => Ok(()),
        }
    }
}

pub(crate) fn check_amount(amount: f64) -> DunningResult<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(DunningError::validation("amount must be positive"))
    }
}

fn check_due_day(due_day: u8) -> DunningResult<()> {
    if (1..=31).contains(&due_day) {
        Ok(())
    } else {
        Err(DunningError::validation("due day must be between 1 and 31"))
    }
}
