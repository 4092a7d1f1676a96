//! Integration tests for the Customer, Charge and Message repositories.

use chrono::{Duration, NaiveDate, Utc};
use dunning_core::error::DunningError;
use dunning_core::models::charge::{ChargeFilter, ChargeStatus, CreateCharge, UpdateCharge};
use dunning_core::models::customer::{
    CreateCustomer, CustomerFilter, CustomerSortField, SortOrder, UpdateCustomer,
};
use dunning_core::models::message::{CreateMessage, MessageFilter, MessageStatus, UpdateMessage};
use dunning_core::models::tenant::CreateTenant;
use dunning_core::repository::{
    ChargeRepository, CustomerRepository, MessageRepository, Pagination, TenantRepository,
};
use dunning_db::repository::{
    SurrealChargeRepository, SurrealCustomerRepository, SurrealMessageRepository,
    SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> (Surreal<Db>, Uuid) {
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

    (db, tenant.id)
}

fn customer(name: &str, phone: &str, amount: f64) -> CreateCustomer {
    CreateCustomer {
        name: name.into(),
        phone: phone.into(),
        amount,
        due_day: 10,
        notes: None,
    }
}

fn charge(
    customer_id: Uuid,
    amount: f64,
    due_date: NaiveDate,
    status: ChargeStatus,
) -> CreateCharge {
    CreateCharge {
        customer_id,
        amount,
        due_date,
        status,
        pix_qr_code: None,
        pix_copy_paste: None,
        notes: None,
    }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn customers_are_tenant_scoped() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealCustomerRepository::new(db);
    let c = repo.create(tenant_id, customer("Ana", "5511999", 120.0)).await.unwrap();

    let err = repo.get_by_id(Uuid::new_v4(), c.id).await.unwrap_err();
    assert!(matches!(err, DunningError::NotFound { .. }));
    assert_eq!(repo.get_by_id(tenant_id, c.id).await.unwrap().name, "Ana");
}

#[tokio::test]
async fn active_phone_lookup_ignores_inactive_and_excluded() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealCustomerRepository::new(db);
    let c = repo.create(tenant_id, customer("Ana", "5511999", 120.0)).await.unwrap();

    let hit = repo.find_active_by_phone(tenant_id, "5511999", None).await.unwrap();
    assert_eq!(hit.map(|h| h.id), Some(c.id));
    assert!(
        repo.find_active_by_phone(tenant_id, "5511999", Some(c.id))
            .await
            .unwrap()
            .is_none()
    );

    repo.update(
        tenant_id,
        c.id,
        UpdateCustomer {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(
        repo.find_active_by_phone(tenant_id, "5511999", None)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn customer_list_sorts_and_searches() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealCustomerRepository::new(db);
    repo.create(tenant_id, customer("Bruno", "111", 50.0)).await.unwrap();
    repo.create(tenant_id, customer("Ana", "222", 300.0)).await.unwrap();
    repo.create(tenant_id, customer("Carla", "333", 10.0)).await.unwrap();

    let by_amount = repo
        .list(
            tenant_id,
            CustomerFilter {
                sort_by: CustomerSortField::Amount,
                sort_order: SortOrder::Asc,
                ..Default::default()
            },
            Pagination::page(1, 2),
        )
        .await
        .unwrap();
    assert_eq!(by_amount.total, 3);
    let names: Vec<_> = by_amount.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Carla", "Bruno"]);

    let search = repo
        .list(
            tenant_id,
            CustomerFilter {
                search: Some("ana".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(search.total, 1);

    let ids = repo.search_ids_by_name(tenant_id, "AR").await.unwrap();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn charge_filters_and_totals() {
    let (db, tenant_id) = setup().await;
    let customers = SurrealCustomerRepository::new(db.clone());
    let charges = SurrealChargeRepository::new(db);
    let c = customers.create(tenant_id, customer("Ana", "1", 10.0)).await.unwrap();

    charges
        .create(tenant_id, charge(c.id, 100.0, day("2026-03-05"), ChargeStatus::Pending))
        .await
        .unwrap();
    charges
        .create(tenant_id, charge(c.id, 50.5, day("2026-03-20"), ChargeStatus::Pending))
        .await
        .unwrap();
    let april = charges
        .create(tenant_id, charge(c.id, 70.0, day("2026-04-01"), ChargeStatus::Pending))
        .await
        .unwrap();
    assert_eq!(april.due_date, day("2026-04-01"));

    let march = ChargeFilter::default().due_between(day("2026-03-01"), day("2026-04-01"));
    let totals = charges.totals(tenant_id, march.clone()).await.unwrap();
    assert_eq!(totals.count, 2);
    assert!((totals.amount - 150.5).abs() < 1e-9);

    let page = charges.list(tenant_id, march, Pagination::page(1, 1)).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].due_date, day("2026-03-05"));

    let none = charges
        .totals(
            tenant_id,
            ChargeFilter {
                statuses: vec![ChargeStatus::Paid],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(none.count, 0);
    assert_eq!(none.amount, 0.0);
}

#[tokio::test]
async fn mark_overdue_flips_only_past_pending() {
    let (db, tenant_id) = setup().await;
    let customers = SurrealCustomerRepository::new(db.clone());
    let charges = SurrealChargeRepository::new(db);
    let c = customers.create(tenant_id, customer("Ana", "1", 10.0)).await.unwrap();
    let today = day("2026-03-10");

    let past = charges
        .create(tenant_id, charge(c.id, 10.0, day("2026-03-09"), ChargeStatus::Pending))
        .await
        .unwrap();
    let paid = charges
        .create(tenant_id, charge(c.id, 10.0, day("2026-03-01"), ChargeStatus::Pending))
        .await
        .unwrap();
    charges
        .update(
            tenant_id,
            paid.id,
            UpdateCharge {
                status: Some(ChargeStatus::Paid),
                paid_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let due_today = charges
        .create(tenant_id, charge(c.id, 10.0, today, ChargeStatus::Pending))
        .await
        .unwrap();

    assert_eq!(charges.mark_overdue(tenant_id, today).await.unwrap(), 1);
    for (id, expected) in [
        (past.id, ChargeStatus::Overdue),
        (paid.id, ChargeStatus::Paid),
        (due_today.id, ChargeStatus::Pending),
    ] {
        let stored = charges.get_by_id(tenant_id, id).await.unwrap();
        assert_eq!(stored.status, expected);
    }
}

#[tokio::test]
async fn messages_list_newest_first_and_update() {
    let (db, tenant_id) = setup().await;
    let customers = SurrealCustomerRepository::new(db.clone());
    let charges = SurrealChargeRepository::new(db.clone());
    let messages = SurrealMessageRepository::new(db);
    let c = customers.create(tenant_id, customer("Ana", "5511", 10.0)).await.unwrap();
    let ch = charges
        .create(tenant_id, charge(c.id, 10.0, day("2026-03-09"), ChargeStatus::Pending))
        .await
        .unwrap();

    for body in ["first reminder", "second reminder", "third reminder"] {
        messages
            .create(
                tenant_id,
                CreateMessage {
                    customer_id: c.id,
                    charge_id: Some(ch.id),
                    phone: "5511".into(),
                    body: body.into(),
                    status: MessageStatus::Scheduled,
                    scheduled_at: Some(Utc::now() + Duration::hours(1)),
                },
            )
            .await
            .unwrap();
    }

    let recent = messages.recent_for_charge(tenant_id, ch.id, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].created_at >= recent[1].created_at);

    let found = messages
        .list(
            tenant_id,
            MessageFilter {
                search: Some("SECOND".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);

    let by_name = messages
        .list(
            tenant_id,
            MessageFilter {
                search: Some("zzz".into()),
                search_customer_ids: vec![c.id],
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_name.total, 3);

    let target = found.items[0].id;
    let updated = messages
        .update(
            tenant_id,
            target,
            UpdateMessage {
                status: Some(MessageStatus::Failed),
                error: Some(Some("gateway timeout".into())),
                attempts: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, MessageStatus::Failed);
    assert_eq!(updated.attempts, 2);
    assert_eq!(updated.error.as_deref(), Some("gateway timeout"));
}
