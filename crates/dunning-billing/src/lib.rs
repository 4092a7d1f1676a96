//! Dunning Billing: tenant administration and the tenant-scoped
//! customer, charge, message and dashboard services.
//!
//! Services are generic over the `dunning-core` repository traits and
//! always take the tenant id from the caller's authenticated context,
//! never from client input.

pub mod calendar;
pub mod charge;
pub mod customer;
pub mod dashboard;
pub mod message;
pub mod tenant;

pub use charge::{ChargeChanges, ChargeQuery, ChargeService, ChargeSummary, ChargeView, NewCharge};
pub use customer::{CustomerDetail, CustomerService};
pub use dashboard::{DashboardService, DashboardStats};
pub use message::{MessageChanges, MessageQuery, MessageService, MessageView, NewMessage};
pub use tenant::{AdminAccount, NewTenant, TenantChanges, TenantDetail, TenantService};
