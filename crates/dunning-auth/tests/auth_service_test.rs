//! Integration tests for the authentication service.

use chrono::{Duration, Utc};
use dunning_auth::config::AuthConfig;
use dunning_auth::password;
use dunning_auth::service::{AuthService, LoginInput, RegisterInput};
use dunning_auth::token;
use dunning_core::error::DunningError;
use dunning_core::models::refresh_token::CreateRefreshToken;
use dunning_core::models::tenant::{CreateTenant, UpdateTenant};
use dunning_core::models::user::{CreateUser, Role, UpdateUser};
use dunning_core::repository::{RefreshTokenRepository, TenantRepository, UserRepository};
use dunning_db::repository::{
    SurrealRefreshTokenRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Service = AuthService<
    SurrealUserRepository<Db>,
    SurrealTenantRepository<Db>,
    SurrealRefreshTokenRepository<Db>,
>;

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "an-integration-test-secret-of-32-bytes".into(),
        jwt_issuer: "dunning-test".into(),
        bcrypt_cost: 4,
        ..Default::default()
    }
}

/// In-memory DB with one active tenant and its admin
/// `ana@acme.test` / `senha123`.
async fn setup() -> (Service, Surreal<Db>, Uuid, Uuid) {
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

    let user = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            tenant_id: Some(tenant.id),
            email: "ana@acme.test".into(),
            password_hash: password::hash_password("senha123", 4).unwrap(),
            name: "Ana".into(),
            role: Role::Admin,
            is_admin: false,
        })
        .await
        .unwrap();

    let svc = AuthService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealTenantRepository::new(db.clone()),
        SurrealRefreshTokenRepository::new(db.clone()),
        test_config(),
    );
    (svc, db, tenant.id, user.id)
}

fn login_input(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.into(),
        password: password.into(),
    }
}

fn assert_unauthenticated(err: DunningError, expected: &str) {
    match err {
        DunningError::AuthenticationFailed { reason } => assert_eq!(reason, expected),
        other => panic!("expected AuthenticationFailed({expected}), got {other:?}"),
    }
}

#[tokio::test]
async fn login_happy_path() {
    let (svc, _db, tenant_id, user_id) = setup().await;

    let out = svc.login(login_input("ana@acme.test", "senha123")).await.unwrap();

    assert_eq!(out.user.id, user_id);
    assert_eq!(out.tenant.as_ref().map(|t| t.id), Some(tenant_id));
    assert_eq!(out.tokens.refresh_token.len(), 128);
    assert_eq!(out.tokens.expires_in, 604_800);

    let claims = token::decode_access_token(&out.tokens.access_token, &test_config()).unwrap();
    assert_eq!(claims.user_id, user_id);
    assert_eq!(claims.tenant_id, Some(tenant_id));
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.iss, "dunning-test");
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let (svc, _db, _, _) = setup().await;

    let wrong = svc
        .login(login_input("ana@acme.test", "nope"))
        .await
        .unwrap_err();
    let unknown = svc
        .login(login_input("nobody@acme.test", "senha123"))
        .await
        .unwrap_err();

    assert_eq!(wrong.to_string(), unknown.to_string());
    assert_unauthenticated(wrong, "invalid credentials");
}

#[tokio::test]
async fn inactive_user_cannot_log_in() {
    let (svc, db, _, user_id) = setup().await;
    SurrealUserRepository::new(db)
        .update(
            user_id,
            UpdateUser {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap_err();
    assert_unauthenticated(err, "invalid credentials");
}

#[tokio::test]
async fn inactive_tenant_blocks_login() {
    let (svc, db, tenant_id, _) = setup().await;
    deactivate_tenant(&db, tenant_id).await;

    let err = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap_err();
    assert_unauthenticated(err, "tenant inactive");
}

#[tokio::test]
async fn super_admin_logs_in_without_tenant() {
    let (svc, db, _, _) = setup().await;
    let root = SurrealUserRepository::new(db)
        .create(CreateUser {
            tenant_id: None,
            email: "root@dunning.test".into(),
            password_hash: password::hash_password("root-pass", 4).unwrap(),
            name: "Root".into(),
            role: Role::Admin,
            is_admin: true,
        })
        .await
        .unwrap();

    let out = svc
        .login(login_input("root@dunning.test", "root-pass"))
        .await
        .unwrap();
    assert!(out.tenant.is_none());

    let claims = token::decode_access_token(&out.tokens.access_token, &test_config()).unwrap();
    assert_eq!(claims.user_id, root.id);
    assert_eq!(claims.tenant_id, None);
}

#[tokio::test]
async fn refresh_round_trip_rotates_the_token() {
    let (svc, _db, _, user_id) = setup().await;
    let first = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap();

    let (user, _) = svc.refresh(&first.tokens.refresh_token).await.unwrap();
    assert_eq!(user.id, user_id);

    let rotated = svc.rotate(&first.tokens.refresh_token).await.unwrap();
    assert_ne!(rotated.tokens.refresh_token, first.tokens.refresh_token);

    // The consumed token is gone; the replacement works.
    let err = svc.rotate(&first.tokens.refresh_token).await.unwrap_err();
    assert_unauthenticated(err, "refresh token invalid");
    svc.refresh(&rotated.tokens.refresh_token).await.unwrap();
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let (svc, _db, _, _) = setup().await;
    let out = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap();

    svc.revoke(&out.tokens.refresh_token).await.unwrap();
    svc.revoke(&out.tokens.refresh_token).await.unwrap();
    svc.revoke("never-issued").await.unwrap();

    let err = svc.refresh(&out.tokens.refresh_token).await.unwrap_err();
    assert_unauthenticated(err, "refresh token invalid");
}

#[tokio::test]
async fn revoke_all_drops_every_session() {
    let (svc, _db, _, user_id) = setup().await;
    let a = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap();
    let b = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap();

    svc.revoke_all(user_id).await.unwrap();
    svc.revoke_all(user_id).await.unwrap();

    assert!(svc.refresh(&a.tokens.refresh_token).await.is_err());
    assert!(svc.refresh(&b.tokens.refresh_token).await.is_err());
}

#[tokio::test]
async fn expired_refresh_token_is_deleted() {
    let (svc, db, _, user_id) = setup().await;
    let refresh_repo = SurrealRefreshTokenRepository::new(db);

    let raw = token::generate_refresh_token();
    refresh_repo
        .create(CreateRefreshToken {
            user_id,
            token_hash: token::hash_refresh_token(&raw),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    let err = svc.refresh(&raw).await.unwrap_err();
    assert_unauthenticated(err, "refresh token expired");

    let err = svc.refresh(&raw).await.unwrap_err();
    assert_unauthenticated(err, "refresh token invalid");
}

#[tokio::test]
async fn issuing_sweeps_expired_tokens_of_the_user() {
    let (svc, db, _, user_id) = setup().await;
    let refresh_repo = SurrealRefreshTokenRepository::new(db);

    let stale = token::hash_refresh_token("stale");
    refresh_repo
        .create(CreateRefreshToken {
            user_id,
            token_hash: stale.clone(),
            expires_at: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();

    svc.issue_refresh_token(user_id).await.unwrap();

    assert!(matches!(
        refresh_repo.get_by_token_hash(&stale).await,
        Err(DunningError::NotFound { .. })
    ));
}

#[tokio::test]
async fn refresh_by_deactivated_user_revokes_all_tokens() {
    let (svc, db, _, user_id) = setup().await;
    let a = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap();
    let b = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap();

    SurrealUserRepository::new(db.clone())
        .update(
            user_id,
            UpdateUser {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = svc.refresh(&a.tokens.refresh_token).await.unwrap_err();
    assert_unauthenticated(err, "user inactive");

    let err = svc.refresh(&b.tokens.refresh_token).await.unwrap_err();
    assert_unauthenticated(err, "refresh token invalid");
}

#[tokio::test]
async fn refresh_in_inactive_tenant_fails() {
    let (svc, db, tenant_id, _) = setup().await;
    let out = svc
        .login(login_input("ana@acme.test", "senha123"))
        .await
        .unwrap();
    deactivate_tenant(&db, tenant_id).await;

    let err = svc.refresh(&out.tokens.refresh_token).await.unwrap_err();
    assert_unauthenticated(err, "tenant inactive");
}

#[tokio::test]
async fn purge_expired_counts_removed_tokens() {
    let (svc, db, _, user_id) = setup().await;
    let refresh_repo = SurrealRefreshTokenRepository::new(db);
    for i in 0..3 {
        refresh_repo
            .create(CreateRefreshToken {
                user_id,
                token_hash: token::hash_refresh_token(&format!("old-{i}")),
                expires_at: Utc::now() - Duration::hours(1),
            })
            .await
            .unwrap();
    }
    svc.issue_refresh_token(Uuid::new_v4()).await.unwrap();

    assert_eq!(svc.purge_expired().await.unwrap(), 3);
    assert_eq!(svc.purge_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn register_into_tenant() {
    let (svc, _db, tenant_id, _) = setup().await;

    let registered = svc
        .register(RegisterInput {
            tenant_id,
            email: "bia@acme.test".into(),
            password: "segredo1".into(),
            name: "Bia".into(),
            role: None,
        })
        .await
        .unwrap();
    let user = registered.user;
    assert_eq!(user.role, Role::User);
    assert!(!user.is_admin);
    assert_eq!(registered.tenant.map(|t| t.id), Some(tenant_id));
    assert!(!registered.tokens.access_token.is_empty());

    let (owner, _) = svc.refresh(&registered.tokens.refresh_token).await.unwrap();
    assert_eq!(owner.id, user.id);

    let out = svc
        .login(login_input("bia@acme.test", "segredo1"))
        .await
        .unwrap();
    assert_eq!(out.user.id, user.id);

    let (profile, tenant) = svc.profile(user.id).await.unwrap();
    assert_eq!(profile.email, "bia@acme.test");
    assert_eq!(tenant.map(|t| t.id), Some(tenant_id));
}

#[tokio::test]
async fn register_rejects_duplicates_and_unknown_tenants() {
    let (svc, db, tenant_id, _) = setup().await;
    let input = |tenant_id, password: &str| RegisterInput {
        tenant_id,
        email: "ana@acme.test".into(),
        password: password.into(),
        name: "Ana".into(),
        role: Some(Role::User),
    };

    let err = svc.register(input(tenant_id, "senha123")).await.unwrap_err();
    assert!(matches!(err, DunningError::AlreadyExists { .. }));

    let err = svc
        .register(input(Uuid::new_v4(), "senha123"))
        .await
        .unwrap_err();
    assert!(matches!(err, DunningError::NotFound { .. }));

    let err = svc.register(input(tenant_id, "123")).await.unwrap_err();
    assert!(matches!(err, DunningError::Validation { .. }));

    deactivate_tenant(&db, tenant_id).await;
    let mut other = input(tenant_id, "senha123");
    other.email = "new@acme.test".into();
    let err = svc.register(other).await.unwrap_err();
    assert!(matches!(err, DunningError::NotFound { .. }));
}

async fn deactivate_tenant(db: &Surreal<Db>, tenant_id: Uuid) {
    SurrealTenantRepository::new(db.clone())
        .update(
            tenant_id,
            UpdateTenant {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}
