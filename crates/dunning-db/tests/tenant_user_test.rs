//! Integration tests for the Tenant, User and RefreshToken repositories.

use chrono::{Duration, Utc};
use dunning_core::error::DunningError;
use dunning_core::models::refresh_token::CreateRefreshToken;
use dunning_core::models::tenant::{CreateTenant, IntegrationCredential, TenantFilter, UpdateTenant};
use dunning_core::models::user::{CreateUser, Role, UpdateUser};
use dunning_core::repository::{
    Pagination, RefreshTokenRepository, TenantRepository, UserRepository,
};
use dunning_db::repository::{
    SurrealRefreshTokenRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dunning_db::run_migrations(&db).await.unwrap();
    db
}

fn tenant(slug: &str) -> CreateTenant {
    CreateTenant {
        name: format!("Tenant {slug}"),
        slug: slug.into(),
        config: None,
    }
}

fn user(tenant_id: Option<Uuid>, email: &str, is_admin: bool) -> CreateUser {
    CreateUser {
        tenant_id,
        email: email.into(),
        password_hash: "$2b$04$not-a-real-hash".into(),
        name: "Someone".into(),
        role: Role::User,
        is_admin,
    }
}

#[tokio::test]
async fn tenant_slug_is_unique() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let created = repo.create(tenant("acme")).await.unwrap();
    assert!(created.active);
    assert!(!created.has_integration_token());

    let err = repo.create(tenant("acme")).await.unwrap_err();
    assert!(matches!(err, DunningError::AlreadyExists { .. }));

    let found = repo.get_by_slug("acme").await.unwrap();
    assert_eq!(found.id, created.id);
}

#[tokio::test]
async fn integration_token_pair_is_written_and_cleared_together() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);
    let t = repo.create(tenant("acme")).await.unwrap();

    let credential = IntegrationCredential {
        token_id: "api_0123".into(),
        token_hash: "$2b$04$hash".into(),
    };
    let updated = repo
        .set_integration_token(t.id, Some(credential.clone()))
        .await
        .unwrap();
    assert_eq!(updated.integration_token, Some(credential));

    let found = repo.get_active_by_integration_token_id("api_0123").await.unwrap();
    assert_eq!(found.id, t.id);

    repo.update(
        t.id,
        UpdateTenant {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let err = repo
        .get_active_by_integration_token_id("api_0123")
        .await
        .unwrap_err();
    assert!(matches!(err, DunningError::NotFound { .. }));

    let cleared = repo.set_integration_token(t.id, None).await.unwrap();
    assert!(cleared.integration_token.is_none());
}

#[tokio::test]
async fn tenant_list_filters_by_search_and_active() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);
    repo.create(tenant("alpha")).await.unwrap();
    let beta = repo.create(tenant("beta")).await.unwrap();
    repo.update(
        beta.id,
        UpdateTenant {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let all = repo
        .list(TenantFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let active = repo
        .list(
            TenantFilter {
                active: Some(true),
                search: None,
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(active.total, 1);
    assert_eq!(active.items[0].slug, "alpha");

    let search = repo
        .list(
            TenantFilter {
                active: None,
                search: Some("BET".into()),
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(search.items.len(), 1);
    assert_eq!(search.items[0].id, beta.id);
}

#[tokio::test]
async fn email_is_unique_per_tenant_only() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let users = SurrealUserRepository::new(db);
    let t1 = tenants.create(tenant("t1")).await.unwrap();
    let t2 = tenants.create(tenant("t2")).await.unwrap();

    users.create(user(Some(t1.id), "a@x.com", false)).await.unwrap();
    users.create(user(Some(t2.id), "a@x.com", false)).await.unwrap();

    let err = users
        .create(user(Some(t1.id), "a@x.com", false))
        .await
        .unwrap_err();
    assert!(matches!(err, DunningError::AlreadyExists { .. }));

    let counts = tenants.counts(t1.id).await.unwrap();
    assert_eq!(counts.users, 1);
}

#[tokio::test]
async fn tenantless_user_must_be_super_admin() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db);

    let err = users.create(user(None, "x@x.com", false)).await.unwrap_err();
    assert!(matches!(err, DunningError::Validation { .. }));

    let root = users.create(user(None, "root@x.com", true)).await.unwrap();
    assert!(root.is_super_admin());
}

#[tokio::test]
async fn scope_lookup_distinguishes_null_tenant() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let users = SurrealUserRepository::new(db);
    let t = tenants.create(tenant("t1")).await.unwrap();

    let root = users.create(user(None, "root@x.com", true)).await.unwrap();
    let member = users.create(user(Some(t.id), "m@x.com", false)).await.unwrap();

    assert_eq!(users.get_active_in_scope(root.id, None).await.unwrap().id, root.id);
    assert!(users.get_active_in_scope(root.id, Some(t.id)).await.is_err());
    assert!(users.get_active_in_scope(member.id, None).await.is_err());
    assert_eq!(
        users.get_active_in_scope(member.id, Some(t.id)).await.unwrap().id,
        member.id
    );

    users
        .update(
            member.id,
            UpdateUser {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(users.get_active_in_scope(member.id, Some(t.id)).await.is_err());
    assert!(users.get_active_by_email("m@x.com").await.is_err());
}

#[tokio::test]
async fn refresh_token_expiry_sweeps() {
    let db = setup().await;
    let repo = SurrealRefreshTokenRepository::new(db);
    let user_id = Uuid::new_v4();
    let other_user = Uuid::new_v4();
    let now = Utc::now();

    for (owner, hash, offset) in [
        (user_id, "live", Duration::days(30)),
        (user_id, "stale", -Duration::days(1)),
        (other_user, "other-stale", -Duration::days(1)),
    ] {
        repo.create(CreateRefreshToken {
            user_id: owner,
            token_hash: hash.into(),
            expires_at: now + offset,
        })
        .await
        .unwrap();
    }

    assert_eq!(repo.delete_expired_for_user(user_id, now).await.unwrap(), 1);
    assert!(repo.get_by_token_hash("live").await.is_ok());
    assert!(repo.get_by_token_hash("stale").await.is_err());
    assert!(repo.get_by_token_hash("other-stale").await.is_ok());

    assert_eq!(repo.delete_all_expired(now).await.unwrap(), 1);

    repo.delete_for_user(user_id).await.unwrap();
    assert!(repo.get_by_token_hash("live").await.is_err());

    // Deleting an unknown token is not an error.
    repo.delete_by_token_hash("never-issued").await.unwrap();
}
