//! Integration tests for the customer, charge, message and dashboard
//! services.

use chrono::{Duration, NaiveDate};
use dunning_billing::calendar;
use dunning_billing::charge::{ChargeChanges, ChargeQuery, ChargeService, NewCharge};
use dunning_billing::customer::CustomerService;
use dunning_billing::dashboard::DashboardService;
use dunning_billing::message::{MessageChanges, MessageQuery, MessageService, NewMessage};
use dunning_core::error::DunningError;
use dunning_core::models::charge::{ChargeStatus, CreateCharge, UpdateCharge};
use dunning_core::models::customer::{CreateCustomer, CustomerFilter, UpdateCustomer};
use dunning_core::models::message::MessageStatus;
use dunning_core::models::tenant::CreateTenant;
use dunning_core::repository::{ChargeRepository, Pagination, TenantRepository};
use dunning_db::repository::{
    SurrealChargeRepository, SurrealCustomerRepository, SurrealMessageRepository,
    SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Customers = CustomerService<SurrealCustomerRepository<Db>, SurrealChargeRepository<Db>>;
type Charges = ChargeService<
    SurrealChargeRepository<Db>,
    SurrealCustomerRepository<Db>,
    SurrealMessageRepository<Db>,
>;
type Messages = MessageService<
    SurrealMessageRepository<Db>,
    SurrealCustomerRepository<Db>,
    SurrealChargeRepository<Db>,
>;

struct Fixture {
    db: Surreal<Db>,
    tenant_id: Uuid,
    customers: Customers,
    charges: Charges,
    messages: Messages,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dunning_db::run_migrations(&db).await.unwrap();

    let tenant = SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            name: "Acme".into(),
            slug: "acme".into(),
            config: None,
        })
        .await
        .unwrap();

    Fixture {
        customers: CustomerService::new(
            SurrealCustomerRepository::new(db.clone()),
            SurrealChargeRepository::new(db.clone()),
        ),
        charges: ChargeService::new(
            SurrealChargeRepository::new(db.clone()),
            SurrealCustomerRepository::new(db.clone()),
            SurrealMessageRepository::new(db.clone()),
        ),
        messages: MessageService::new(
            SurrealMessageRepository::new(db.clone()),
            SurrealCustomerRepository::new(db.clone()),
            SurrealChargeRepository::new(db.clone()),
        ),
        tenant_id: tenant.id,
        db,
    }
}

fn customer(name: &str, phone: &str) -> CreateCustomer {
    CreateCustomer {
        name: name.into(),
        phone: phone.into(),
        amount: 150.0,
        due_day: 10,
        notes: None,
    }
}

fn new_charge(customer_id: Uuid, due_date: NaiveDate) -> NewCharge {
    NewCharge {
        customer_id,
        amount: 99.9,
        due_date,
        pix_qr_code: None,
        pix_copy_paste: None,
        notes: None,
    }
}

fn new_message(customer_id: Uuid, charge_id: Option<Uuid>) -> NewMessage {
    NewMessage {
        customer_id,
        charge_id,
        phone: "5511999990000".into(),
        body: "Lembrete de pagamento".into(),
        status: None,
        scheduled_at: None,
    }
}

fn offset(days: i64) -> NaiveDate {
    calendar::today() + Duration::days(days)
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn active_phone_numbers_are_unique() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "5511999990000"))
        .await
        .unwrap();

    let err = f
        .customers
        .create(f.tenant_id, customer("Bia", "5511999990000"))
        .await
        .unwrap_err();
    assert!(matches!(err, DunningError::AlreadyExists { .. }));

    // Freed once the holder is inactive...
    f.customers.deactivate(f.tenant_id, ana.id).await.unwrap();
    f.customers
        .create(f.tenant_id, customer("Bia", "5511999990000"))
        .await
        .unwrap();

    // ...so the original holder cannot come back.
    let err = f.customers.activate(f.tenant_id, ana.id).await.unwrap_err();
    assert!(matches!(err, DunningError::AlreadyExists { .. }));
}

#[tokio::test]
async fn customer_state_changes_are_strict() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();

    assert!(matches!(
        f.customers.activate(f.tenant_id, ana.id).await,
        Err(DunningError::Validation { .. })
    ));
    f.customers.deactivate(f.tenant_id, ana.id).await.unwrap();
    assert!(matches!(
        f.customers.deactivate(f.tenant_id, ana.id).await,
        Err(DunningError::Validation { .. })
    ));
}

#[tokio::test]
async fn customer_update_rechecks_phone_and_values() {
    let f = setup().await;
    f.customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    let bia = f
        .customers
        .create(f.tenant_id, customer("Bia", "2"))
        .await
        .unwrap();

    let taken = UpdateCustomer {
        phone: Some("1".into()),
        ..Default::default()
    };
    assert!(matches!(
        f.customers.update(f.tenant_id, bia.id, taken).await,
        Err(DunningError::AlreadyExists { .. })
    ));

    let bad_day = UpdateCustomer {
        due_day: Some(32),
        ..Default::default()
    };
    assert!(matches!(
        f.customers.update(f.tenant_id, bia.id, bad_day).await,
        Err(DunningError::Validation { .. })
    ));

    let same_phone = UpdateCustomer {
        phone: Some("2".into()),
        amount: Some(200.0),
        ..Default::default()
    };
    let updated = f
        .customers
        .update(f.tenant_id, bia.id, same_phone)
        .await
        .unwrap();
    assert_eq!(updated.amount, 200.0);
}

#[tokio::test]
async fn customer_detail_shows_five_latest_charges() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    for months in 0..7 {
        f.charges
            .create(f.tenant_id, new_charge(ana.id, offset(30 * months)))
            .await
            .unwrap();
    }

    let detail = f.customers.get(f.tenant_id, ana.id).await.unwrap();
    assert_eq!(detail.recent_charges.len(), 5);
    assert_eq!(detail.recent_charges[0].due_date, offset(180));

    let page = f
        .customers
        .list(f.tenant_id, CustomerFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

// ---------------------------------------------------------------------------
// Charges
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_is_derived_from_due_date() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();

    let late = f
        .charges
        .create(f.tenant_id, new_charge(ana.id, offset(-1)))
        .await
        .unwrap();
    assert_eq!(late.charge.status, ChargeStatus::Overdue);
    assert_eq!(late.customer.as_ref().map(|c| c.id), Some(ana.id));

    let today = f
        .charges
        .create(f.tenant_id, new_charge(ana.id, offset(0)))
        .await
        .unwrap();
    assert_eq!(today.charge.status, ChargeStatus::Pending);
}

#[tokio::test]
async fn charges_need_an_active_customer() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    f.customers.deactivate(f.tenant_id, ana.id).await.unwrap();

    for customer_id in [ana.id, Uuid::new_v4()] {
        assert!(matches!(
            f.charges
                .create(f.tenant_id, new_charge(customer_id, offset(3)))
                .await,
            Err(DunningError::NotFound { .. })
        ));
    }
}

#[tokio::test]
async fn moving_the_due_date_rederives_status() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    let id = f
        .charges
        .create(f.tenant_id, new_charge(ana.id, offset(5)))
        .await
        .unwrap()
        .charge
        .id;

    let moved_back = ChargeChanges {
        due_date: Some(offset(-2)),
        ..Default::default()
    };
    let view = f.charges.update(f.tenant_id, id, moved_back).await.unwrap();
    assert_eq!(view.charge.status, ChargeStatus::Overdue);

    // A date change beats an explicit OVERDUE for a future date.
    let moved_forward = ChargeChanges {
        due_date: Some(offset(10)),
        status: Some(ChargeStatus::Overdue),
        ..Default::default()
    };
    let view = f.charges.update(f.tenant_id, id, moved_forward).await.unwrap();
    assert_eq!(view.charge.status, ChargeStatus::Pending);

    let paid = ChargeChanges {
        status: Some(ChargeStatus::Paid),
        ..Default::default()
    };
    let view = f.charges.update(f.tenant_id, id, paid).await.unwrap();
    assert_eq!(view.charge.status, ChargeStatus::Paid);
    assert!(view.charge.paid_at.is_some());

    let moved_again = ChargeChanges {
        due_date: Some(offset(-30)),
        ..Default::default()
    };
    let view = f.charges.update(f.tenant_id, id, moved_again).await.unwrap();
    assert_eq!(view.charge.status, ChargeStatus::Paid);
}

#[tokio::test]
async fn mark_paid_only_once() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    let id = f
        .charges
        .create(f.tenant_id, new_charge(ana.id, offset(-3)))
        .await
        .unwrap()
        .charge
        .id;

    let paid = f.charges.mark_paid(f.tenant_id, id).await.unwrap();
    assert_eq!(paid.charge.status, ChargeStatus::Paid);
    assert!(paid.charge.paid_at.is_some());

    assert!(matches!(
        f.charges.mark_paid(f.tenant_id, id).await,
        Err(DunningError::Validation { .. })
    ));
}

#[tokio::test]
async fn list_by_month_and_status() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    for due in ["2030-03-01", "2030-03-31", "2030-04-01", "2030-02-28"] {
        f.charges
            .create(f.tenant_id, new_charge(ana.id, day(due)))
            .await
            .unwrap();
    }

    let march = f
        .charges
        .list(
            f.tenant_id,
            ChargeQuery {
                month: Some(3),
                year: Some(2030),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(march.total, 2);
    assert!(march.items.iter().all(|v| v.customer.is_some()));
    assert_eq!(march.items[0].charge.due_date, day("2030-03-01"));

    let paid = f
        .charges
        .list(
            f.tenant_id,
            ChargeQuery {
                status: Some(ChargeStatus::Paid),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(paid.total, 0);
}

#[tokio::test]
async fn overdue_listing_reconciles_pending_charges() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();

    // Stored PENDING with a past due date, as if created days ago.
    let stale = SurrealChargeRepository::new(f.db.clone())
        .create(
            f.tenant_id,
            CreateCharge {
                customer_id: ana.id,
                amount: 10.0,
                due_date: offset(-4),
                status: ChargeStatus::Pending,
                pix_qr_code: None,
                pix_copy_paste: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    f.charges
        .create(f.tenant_id, new_charge(ana.id, offset(0)))
        .await
        .unwrap();

    let overdue = f.charges.overdue(f.tenant_id).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].charge.id, stale.id);
    assert_eq!(overdue[0].charge.status, ChargeStatus::Overdue);

    let due_today = f.charges.due_today(f.tenant_id).await.unwrap();
    assert_eq!(due_today.len(), 1);

    assert_eq!(f.charges.reconcile_overdue(f.tenant_id).await.unwrap(), 0);
}

#[tokio::test]
async fn summary_buckets_open_charges() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();

    let mut ids = Vec::new();
    for days in [-1, 0, 1, 2, 3] {
        let view = f
            .charges
            .create(f.tenant_id, new_charge(ana.id, offset(days)))
            .await
            .unwrap();
        ids.push(view.charge.id);
    }
    let paid_today = f
        .charges
        .create(f.tenant_id, new_charge(ana.id, offset(0)))
        .await
        .unwrap();
    f.charges
        .mark_paid(f.tenant_id, paid_today.charge.id)
        .await
        .unwrap();

    for _ in 0..3 {
        f.messages
            .create(f.tenant_id, new_message(ana.id, Some(ids[0])))
            .await
            .unwrap();
    }

    let summary = f.charges.summary(f.tenant_id).await.unwrap();

    let bucket_ids = |items: &[dunning_billing::charge::SummaryItem]| {
        items.iter().map(|i| i.charge.id).collect::<Vec<_>>()
    };
    assert_eq!(bucket_ids(&summary.overdue), vec![ids[0]]);
    assert_eq!(bucket_ids(&summary.due_today), vec![ids[1]]);
    assert_eq!(bucket_ids(&summary.upcoming), vec![ids[2], ids[3]]);

    assert_eq!(summary.overdue[0].messages.len(), 2);
    assert!(summary.upcoming[0].messages.is_empty());
    assert_eq!(
        summary.due_today[0].customer.as_ref().map(|c| c.name.as_str()),
        Some("Ana")
    );
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn message_create_maps_status_and_schedule() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    let charge = f
        .charges
        .create(f.tenant_id, new_charge(ana.id, offset(2)))
        .await
        .unwrap();

    let mut input = new_message(ana.id, Some(charge.charge.id));
    input.status = Some("paid".into());
    input.scheduled_at = Some("13/11/2030 10:30".into());
    let view = f.messages.create(f.tenant_id, input).await.unwrap();

    assert_eq!(view.message.status, MessageStatus::Sent);
    assert_eq!(
        view.message.scheduled_at.map(|d| d.to_rfc3339()),
        Some("2030-11-13T10:30:00+00:00".to_string())
    );
    assert_eq!(view.charge.as_ref().map(|c| c.id), Some(charge.charge.id));

    let mut input = new_message(ana.id, None);
    input.status = Some("OVERDUE".into());
    let view = f.messages.create(f.tenant_id, input).await.unwrap();
    assert_eq!(view.message.status, MessageStatus::Scheduled);
    assert!(view.charge.is_none());
}

#[tokio::test]
async fn message_charge_must_belong_to_customer() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    let bia = f
        .customers
        .create(f.tenant_id, customer("Bia", "2"))
        .await
        .unwrap();
    let bias_charge = f
        .charges
        .create(f.tenant_id, new_charge(bia.id, offset(2)))
        .await
        .unwrap();

    for charge_id in [bias_charge.charge.id, Uuid::new_v4()] {
        assert!(matches!(
            f.messages
                .create(f.tenant_id, new_message(ana.id, Some(charge_id)))
                .await,
            Err(DunningError::Validation { .. })
        ));
    }

    assert!(matches!(
        f.messages
            .create(f.tenant_id, new_message(Uuid::new_v4(), None))
            .await,
        Err(DunningError::NotFound { .. })
    ));
}

#[tokio::test]
async fn message_update_records_delivery() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    let id = f
        .messages
        .create(f.tenant_id, new_message(ana.id, None))
        .await
        .unwrap()
        .message
        .id;

    let failed = MessageChanges {
        status: Some(MessageStatus::Failed),
        error: Some(Some("timeout".into())),
        attempts: Some(1),
        ..Default::default()
    };
    let view = f.messages.update(f.tenant_id, id, failed).await.unwrap();
    assert_eq!(view.message.status, MessageStatus::Failed);
    assert_eq!(view.message.error.as_deref(), Some("timeout"));

    let sent = MessageChanges {
        status: Some(MessageStatus::Sent),
        sent_at: Some(Some("2030-01-02T03:04:05Z".into())),
        error: Some(None),
        attempts: Some(2),
    };
    let view = f.messages.update(f.tenant_id, id, sent).await.unwrap();
    assert_eq!(view.message.error, None);
    assert_eq!(view.message.attempts, 2);
    assert!(view.message.sent_at.is_some());

    let too_long = MessageChanges {
        error: Some(Some("x".repeat(5001))),
        ..Default::default()
    };
    assert!(matches!(
        f.messages.update(f.tenant_id, id, too_long).await,
        Err(DunningError::Validation { .. })
    ));
}

#[tokio::test]
async fn message_search_matches_customer_name() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana Souza", "1"))
        .await
        .unwrap();
    let bia = f
        .customers
        .create(f.tenant_id, customer("Bia Lima", "2"))
        .await
        .unwrap();
    f.messages
        .create(f.tenant_id, new_message(ana.id, None))
        .await
        .unwrap();
    f.messages
        .create(f.tenant_id, new_message(bia.id, None))
        .await
        .unwrap();

    let page = f
        .messages
        .list(
            f.tenant_id,
            MessageQuery {
                search: Some("souza".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].message.customer_id, ana.id);
    assert!(page.items[0].customer.is_some());
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dashboard_monthly_stats() {
    let f = setup().await;
    let ana = f
        .customers
        .create(f.tenant_id, customer("Ana", "1"))
        .await
        .unwrap();
    let repo = SurrealChargeRepository::new(f.db.clone());

    let seed = |amount: f64, due: &str, status: ChargeStatus| CreateCharge {
        customer_id: ana.id,
        amount,
        due_date: day(due),
        status,
        pix_qr_code: None,
        pix_copy_paste: None,
        notes: None,
    };
    repo.create(f.tenant_id, seed(100.0, "2026-03-10", ChargeStatus::Pending))
        .await
        .unwrap();
    repo.create(f.tenant_id, seed(200.0, "2026-03-20", ChargeStatus::Pending))
        .await
        .unwrap();
    let paid_march = repo
        .create(f.tenant_id, seed(50.0, "2026-03-05", ChargeStatus::Paid))
        .await
        .unwrap();
    let paid_late = repo
        .create(f.tenant_id, seed(80.0, "2026-02-10", ChargeStatus::Paid))
        .await
        .unwrap();
    repo.create(f.tenant_id, seed(30.0, "2026-01-10", ChargeStatus::Overdue))
        .await
        .unwrap();

    for (id, paid_on) in [(paid_march.id, "2026-03-06"), (paid_late.id, "2026-03-02")] {
        repo.update(
            f.tenant_id,
            id,
            UpdateCharge {
                paid_at: Some(calendar::start_of_day(day(paid_on)) + Duration::hours(12)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let stats = DashboardService::new(repo)
        .stats_at(f.tenant_id, None, None, day("2026-03-15"))
        .await
        .unwrap();

    assert_eq!((stats.month, stats.year), (3, 2026));
    assert_eq!(stats.total_receivable, 300.0);
    assert_eq!(stats.total_received, 130.0);
    assert_eq!(stats.total_overdue, 130.0);
    assert_eq!(stats.overdue_count, 2);
    assert_eq!(stats.payment_rate, 33.33);
}

#[tokio::test]
async fn dashboard_for_empty_month() {
    let f = setup().await;
    let stats = DashboardService::new(SurrealChargeRepository::new(f.db.clone()))
        .stats(f.tenant_id, Some(1), Some(2031))
        .await
        .unwrap();
    assert_eq!(stats.payment_rate, 0.0);
    assert_eq!(stats.total_receivable, 0.0);
    assert_eq!(stats.overdue_count, 0);
}
