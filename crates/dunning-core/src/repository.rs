//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! take the `tenant_id` as their first parameter; a record of another
//! tenant is reported as not found.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::DunningResult;
use crate::models::{
    charge::{Charge, ChargeFilter, ChargeTotals, CreateCharge, UpdateCharge},
    customer::{CreateCustomer, Customer, CustomerFilter, UpdateCustomer},
    message::{CreateMessage, Message, MessageFilter, UpdateMessage},
    refresh_token::{CreateRefreshToken, RefreshToken},
    tenant::{CreateTenant, IntegrationCredential, Tenant, TenantCounts, TenantFilter, UpdateTenant},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// Largest page a client may request.
    pub const MAX_LIMIT: u64 = 100;

    /// Build from a 1-based page number. Out-of-range values are
    /// clamped rather than rejected.
    pub fn page(page: u64, limit: u64) -> Self {
        let page = page.max(1);
        let limit = limit.clamp(1, Self::MAX_LIMIT);
        Self {
            offset: (page - 1) * limit,
            limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    /// 1-based page number of this slice.
    pub fn page(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Tenants and credentials (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = DunningResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DunningResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = DunningResult<Tenant>> + Send;
    /// Active tenant holding the integration token with this public id.
    fn get_active_by_integration_token_id(
        &self,
        token_id: &str,
    ) -> impl Future<Output = DunningResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = DunningResult<Tenant>> + Send;
    /// Store or clear the integration token pair in one write.
    fn set_integration_token(
        &self,
        id: Uuid,
        credential: Option<IntegrationCredential>,
    ) -> impl Future<Output = DunningResult<Tenant>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DunningResult<()>> + Send;
    fn list(
        &self,
        filter: TenantFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DunningResult<PaginatedResult<Tenant>>> + Send;
    fn counts(&self, id: Uuid) -> impl Future<Output = DunningResult<TenantCounts>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = DunningResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DunningResult<User>> + Send;
    /// First active user with this email, in any tenant.
    fn get_active_by_email(&self, email: &str)
    -> impl Future<Output = DunningResult<User>> + Send;
    /// Active user with this id inside the given scope. `None` matches
    /// only users without a tenant.
    fn get_active_in_scope(
        &self,
        id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> impl Future<Output = DunningResult<User>> + Send;
    fn find_by_email_in_tenant(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = DunningResult<Option<User>>> + Send;
    /// The tenant's first ADMIN-role user, if any.
    fn find_tenant_admin(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = DunningResult<Option<User>>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = DunningResult<User>> + Send;
}

pub trait RefreshTokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRefreshToken,
    ) -> impl Future<Output = DunningResult<RefreshToken>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = DunningResult<RefreshToken>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DunningResult<()>> + Send;
    /// Idempotent: deleting an unknown token is not an error.
    fn delete_by_token_hash(&self, token_hash: &str)
    -> impl Future<Output = DunningResult<()>> + Send;
    fn delete_for_user(&self, user_id: Uuid) -> impl Future<Output = DunningResult<()>> + Send;
    /// Returns the number of tokens removed.
    fn delete_expired_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = DunningResult<u64>> + Send;
    /// Returns the number of tokens removed.
    fn delete_all_expired(&self, now: DateTime<Utc>)
    -> impl Future<Output = DunningResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped billing records
// ---------------------------------------------------------------------------

pub trait CustomerRepository: Send + Sync {
    fn create(
        &self,
        tenant_id: Uuid,
        input: CreateCustomer,
    ) -> impl Future<Output = DunningResult<Customer>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = DunningResult<Customer>> + Send;
    /// Customers with any of these ids; unknown ids are skipped.
    fn get_many(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> impl Future<Output = DunningResult<Vec<Customer>>> + Send;
    /// Active customer holding `phone`, ignoring `exclude`.
    fn find_active_by_phone(
        &self,
        tenant_id: Uuid,
        phone: &str,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = DunningResult<Option<Customer>>> + Send;
    /// Ids of customers whose name contains `search`.
    fn search_ids_by_name(
        &self,
        tenant_id: Uuid,
        search: &str,
    ) -> impl Future<Output = DunningResult<Vec<Uuid>>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateCustomer,
    ) -> impl Future<Output = DunningResult<Customer>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        filter: CustomerFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DunningResult<PaginatedResult<Customer>>> + Send;
}

pub trait ChargeRepository: Send + Sync {
    fn create(
        &self,
        tenant_id: Uuid,
        input: CreateCharge,
    ) -> impl Future<Output = DunningResult<Charge>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = DunningResult<Charge>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateCharge,
    ) -> impl Future<Output = DunningResult<Charge>> + Send;
    /// Page of matching charges ordered by due date.
    fn list(
        &self,
        tenant_id: Uuid,
        filter: ChargeFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DunningResult<PaginatedResult<Charge>>> + Send;
    /// Every matching charge ordered by due date.
    fn list_all(
        &self,
        tenant_id: Uuid,
        filter: ChargeFilter,
    ) -> impl Future<Output = DunningResult<Vec<Charge>>> + Send;
    fn totals(
        &self,
        tenant_id: Uuid,
        filter: ChargeFilter,
    ) -> impl Future<Output = DunningResult<ChargeTotals>> + Send;
    /// Most recent charges of a customer, latest due date first.
    fn recent_for_customer(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        limit: u64,
    ) -> impl Future<Output = DunningResult<Vec<Charge>>> + Send;
    /// Flip PENDING charges due before `today` to OVERDUE. Returns the
    /// number of charges changed.
    fn mark_overdue(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> impl Future<Output = DunningResult<u64>> + Send;
}

pub trait MessageRepository: Send + Sync {
    fn create(
        &self,
        tenant_id: Uuid,
        input: CreateMessage,
    ) -> impl Future<Output = DunningResult<Message>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = DunningResult<Message>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateMessage,
    ) -> impl Future<Output = DunningResult<Message>> + Send;
    /// Page of matching messages, newest first.
    fn list(
        &self,
        tenant_id: Uuid,
        filter: MessageFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DunningResult<PaginatedResult<Message>>> + Send;
    /// Latest messages attached to a charge, newest first.
    fn recent_for_charge(
        &self,
        tenant_id: Uuid,
        charge_id: Uuid,
        limit: u64,
    ) -> impl Future<Output = DunningResult<Vec<Message>>> + Send;
}
