//! Integration tests for the tenant repository and brand slug claims
//! using in-memory SurrealDB.

use mipropina_core::error::MiPropinaError;
use mipropina_core::models::employee::CreateEmployee;
use mipropina_core::models::tenant::{CompleteOnboarding, UpdateTenant};
use mipropina_core::repository::{
    EmployeeRepository, RatingConfigRepository, TenantRepository,
};
use mipropina_db::repository::{
    SurrealEmployeeRepository, SurrealRatingConfigRepository, SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mipropina_db::run_migrations(&db).await.unwrap();
    db
}

fn onboarding(brand_name: &str, brand_slug: &str) -> CompleteOnboarding {
    CompleteOnboarding {
        first_name: "Lucia".into(),
        last_name: "Gomez".into(),
        phone: "+54 11 5555-0000".into(),
        address: "Av. Corrientes 1234".into(),
        brand_name: brand_name.into(),
        brand_slug: brand_slug.into(),
        admin_path: format!("/admin/{brand_slug}"),
        store_path: format!("/{brand_slug}"),
    }
}

#[tokio::test]
async fn touch_creates_shell_once() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db.clone());

    let first = repo.touch("user_a", Some("a@example.com")).await.unwrap();
    assert_eq!(first.principal_id, "user_a");
    assert_eq!(first.email.as_deref(), Some("a@example.com"));
    assert!(!first.onboarding_complete);
    assert!(first.brand_slug.is_none());

    let second = repo.touch("user_a", None).await.unwrap();
    assert_eq!(second.email.as_deref(), Some("a@example.com"));
    assert_eq!(second.created_at, first.created_at);
    assert!(second.last_seen_at >= first.last_seen_at);

    let mut result = db.query("SELECT * FROM tenant").await.unwrap();
    let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn get_missing_tenant_is_not_found() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let err = repo.get("user_missing").await.unwrap_err();
    assert!(matches!(err, MiPropinaError::NotFound { .. }));
}

#[tokio::test]
async fn complete_onboarding_fills_record_and_finds_by_slug() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.touch("user_a", Some("a@example.com")).await.unwrap();
    repo.claim_slug("user_a", "cafe-luz").await.unwrap();
    let tenant = repo
        .complete_onboarding("user_a", onboarding("Café Luz", "cafe-luz"))
        .await
        .unwrap();

    assert!(tenant.onboarding_complete);
    assert_eq!(tenant.brand_name.as_deref(), Some("Café Luz"));
    assert_eq!(tenant.admin_path.as_deref(), Some("/admin/cafe-luz"));
    assert_eq!(tenant.email.as_deref(), Some("a@example.com"));

    let found = repo.find_by_slug("cafe-luz").await.unwrap().unwrap();
    assert_eq!(found.principal_id, "user_a");
    assert!(repo.find_by_slug("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn slug_claim_conflicts_across_principals() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.claim_slug("user_a", "cafe-luz").await.unwrap();
    // Re-claiming by the holder is fine.
    repo.claim_slug("user_a", "cafe-luz").await.unwrap();

    let err = repo.claim_slug("user_b", "cafe-luz").await.unwrap_err();
    assert!(matches!(err, MiPropinaError::Conflict { .. }));
}

#[tokio::test]
async fn onboarding_releases_abandoned_claims() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.claim_slug("user_a", "first-try").await.unwrap();
    repo.claim_slug("user_a", "second-try").await.unwrap();

    // Claims alone are never released.
    let err = repo.claim_slug("user_b", "first-try").await.unwrap_err();
    assert!(matches!(err, MiPropinaError::Conflict { .. }));

    repo.complete_onboarding("user_a", onboarding("Second Try", "second-try"))
        .await
        .unwrap();

    // The slug the record settled on stays held; the other is free.
    repo.claim_slug("user_b", "first-try").await.unwrap();
    let err = repo.claim_slug("user_b", "second-try").await.unwrap_err();
    assert!(matches!(err, MiPropinaError::Conflict { .. }));
}

#[tokio::test]
async fn interleaved_onboarding_keeps_the_first_brand() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db.clone());

    // Two onboarding attempts of one principal, interleaved claim by claim.
    repo.claim_slug("user_a", "brand-a").await.unwrap();
    repo.claim_slug("user_a", "brand-b").await.unwrap();
    let first = repo
        .complete_onboarding("user_a", onboarding("Brand A", "brand-a"))
        .await
        .unwrap();
    let second = repo
        .complete_onboarding("user_a", onboarding("Brand B", "brand-b"))
        .await
        .unwrap();

    assert_eq!(first.brand_slug.as_deref(), Some("brand-a"));
    assert_eq!(second.brand_slug.as_deref(), Some("brand-a"));
    assert_eq!(second.brand_name.as_deref(), Some("Brand A"));

    // brand-a still belongs to user_a, brand-b was released.
    let err = repo.claim_slug("user_b", "brand-a").await.unwrap_err();
    assert!(matches!(err, MiPropinaError::Conflict { .. }));
    repo.claim_slug("user_b", "brand-b").await.unwrap();

    let mut result = db
        .query("SELECT VALUE meta::id(id) FROM tenant WHERE brand_slug = 'brand-a'")
        .await
        .unwrap();
    let holders: Vec<String> = result.take(0).unwrap();
    assert_eq!(holders, vec!["user_a".to_string()]);
}

#[tokio::test]
async fn onboarding_without_a_shell_creates_the_record() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.claim_slug("user_a", "cafe-luz").await.unwrap();
    let tenant = repo
        .complete_onboarding("user_a", onboarding("Café Luz", "cafe-luz"))
        .await
        .unwrap();

    assert!(tenant.onboarding_complete);
    assert_eq!(tenant.principal_id, "user_a");
    assert_eq!(tenant.store_path.as_deref(), Some("/cafe-luz"));
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.claim_slug("user_a", "cafe-luz").await.unwrap();
    repo.complete_onboarding("user_a", onboarding("Café Luz", "cafe-luz"))
        .await
        .unwrap();

    let updated = repo
        .update(
            "user_a",
            UpdateTenant {
                phone: Some("+54 11 4444-1111".into()),
                logo_url: Some("http://cdn/logo.png".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.phone.as_deref(), Some("+54 11 4444-1111"));
    assert_eq!(updated.logo_url.as_deref(), Some("http://cdn/logo.png"));
    assert_eq!(updated.first_name.as_deref(), Some("Lucia"));
    assert_eq!(updated.brand_slug.as_deref(), Some("cafe-luz"));
}

#[tokio::test]
async fn update_missing_tenant_is_not_found() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let err = repo
        .update(
            "user_missing",
            UpdateTenant {
                phone: Some("12345678".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::NotFound { .. }));
}

#[tokio::test]
async fn delete_cascades_to_owned_records() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let employees = SurrealEmployeeRepository::new(db.clone());
    let configs = SurrealRatingConfigRepository::new(db.clone());

    tenants.claim_slug("user_a", "cafe-luz").await.unwrap();
    tenants
        .complete_onboarding("user_a", onboarding("Café Luz", "cafe-luz"))
        .await
        .unwrap();
    employees
        .create(CreateEmployee {
            owner_id: "user_a".into(),
            first_name: "Juan".into(),
            last_name: "Perez".into(),
            dni: "30111222".into(),
            phone: "1155552222".into(),
            payment_link: "https://www.mercadopago.com.ar/juan".into(),
            photo_url: None,
        })
        .await
        .unwrap();
    configs
        .replace("user_a", vec!["Atención".into()])
        .await
        .unwrap();

    tenants.delete("user_a").await.unwrap();

    assert!(matches!(
        tenants.get("user_a").await.unwrap_err(),
        MiPropinaError::NotFound { .. }
    ));
    assert!(employees.list_by_owner("user_a").await.unwrap().is_empty());
    assert!(configs.get("user_a").await.unwrap().is_none());
    // The slug is free again.
    tenants.claim_slug("user_b", "cafe-luz").await.unwrap();
}
