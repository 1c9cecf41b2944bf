//! Tenant directory integration tests against in-memory SurrealDB, the
//! in-memory identity gateway and a temporary blob root.

use mipropina_core::error::MiPropinaError;
use mipropina_core::models::principal::{Metadata, Principal, keys};
use mipropina_core::repository::{Pagination, TenantRepository};
use mipropina_core::validation::{EmployeeInput, OnboardingInput, PersonalDataInput};
use mipropina_db::FsBlobStore;
use mipropina_db::repository::{SurrealRecordStore, SurrealTenantRepository};
use mipropina_identity::InMemoryIdentityGateway;
use mipropina_tenancy::{AssetUploadMediator, EmployeePhoto, ImageUpload, TenantDirectory};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tempfile::TempDir;

type Directory = TenantDirectory<SurrealRecordStore<Db>, InMemoryIdentityGateway, FsBlobStore>;

struct Harness {
    db: Surreal<Db>,
    identity: InMemoryIdentityGateway,
    directory: Directory,
    assets: TempDir,
}

async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mipropina_db::run_migrations(&db).await.unwrap();

    let assets = TempDir::new().unwrap();
    let store = FsBlobStore::new(assets.path(), "http://localhost:3000/assets");
    let identity = InMemoryIdentityGateway::new();
    let directory = TenantDirectory::new(
        SurrealRecordStore::new(db.clone()),
        identity.clone(),
        AssetUploadMediator::new(store, "brand-assets", "mipropina"),
    );

    Harness {
        db,
        identity,
        directory,
        assets,
    }
}

fn onboarding(brand_name: &str) -> OnboardingInput {
    OnboardingInput {
        first_name: "Lucia".into(),
        last_name: "Gomez".into(),
        phone: "+54 11 5555-0000".into(),
        address: "Av. Corrientes 1234".into(),
        brand_name: brand_name.into(),
    }
}

fn waiter(first_name: &str, last_name: &str) -> EmployeeInput {
    EmployeeInput {
        first_name: first_name.into(),
        last_name: last_name.into(),
        dni: "30111222".into(),
        phone: "1155552222".into(),
        payment_link: "https://link.mercadopago.com.ar/juanperez".into(),
    }
}

async fn onboarded(h: &Harness, principal_id: &str, brand_name: &str) {
    h.directory
        .touch(principal_id, Some("owner@example.com"))
        .await
        .unwrap();
    h.directory
        .complete_onboarding(principal_id, &onboarding(brand_name))
        .await
        .unwrap();
}

#[tokio::test]
async fn onboarding_claims_slug_and_writes_metadata() {
    let h = setup().await;
    h.directory.touch("user_a", Some("lucia@example.com")).await.unwrap();

    let tenant = h
        .directory
        .complete_onboarding("user_a", &onboarding("Café Luz"))
        .await
        .unwrap();

    assert!(tenant.onboarding_complete);
    assert_eq!(tenant.brand_slug.as_deref(), Some("cafe-luz"));
    assert_eq!(tenant.admin_path.as_deref(), Some("/admin/cafe-luz"));
    assert_eq!(tenant.store_path.as_deref(), Some("/cafe-luz"));
    assert_eq!(tenant.email.as_deref(), Some("lucia@example.com"));

    let principal = h.identity.principal("user_a").unwrap();
    assert!(principal.onboarding_complete());
    assert_eq!(principal.metadata_str(keys::BRAND_SLUG), Some("cafe-luz"));
    assert_eq!(principal.metadata_str(keys::FULL_NAME), Some("Lucia Gomez"));

    let profile = h.directory.find_public_profile("cafe-luz").await.unwrap();
    assert_eq!(profile.unwrap().brand_name, "Café Luz");
}

#[tokio::test]
async fn slug_owned_by_another_principal_is_a_conflict() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;

    h.directory.touch("user_b", None).await.unwrap();
    let err = h
        .directory
        .complete_onboarding("user_b", &onboarding("CAFE LUZ!"))
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Conflict { .. }));

    let b = SurrealTenantRepository::new(h.db.clone()).get("user_b").await.unwrap();
    assert!(!b.onboarding_complete);
    assert!(b.brand_slug.is_none());
}

#[tokio::test]
async fn double_onboarding_keeps_one_tenant_and_an_immutable_brand() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;

    let again = h
        .directory
        .complete_onboarding("user_a", &onboarding("Cafe Luz"))
        .await
        .unwrap();
    assert_eq!(again.brand_slug.as_deref(), Some("cafe-luz"));

    let err = h
        .directory
        .complete_onboarding("user_a", &onboarding("Bar Norte"))
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Conflict { .. }));

    let mut response = h
        .db
        .query("SELECT VALUE meta::id(id) FROM tenant")
        .await
        .unwrap();
    let ids: Vec<String> = response.take(0).unwrap();
    assert_eq!(ids, vec!["user_a".to_string()]);

    let other = h.directory.find_public_profile("bar-norte").await.unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn invalid_onboarding_reports_fields_and_persists_nothing() {
    let h = setup().await;
    h.directory.touch("user_a", None).await.unwrap();

    let mut input = onboarding("!!!");
    input.phone = "abc".into();
    let err = h
        .directory
        .complete_onboarding("user_a", &input)
        .await
        .unwrap_err();

    match err {
        MiPropinaError::Validation { fields, .. } => {
            assert!(fields.contains_key("brandName"));
            assert!(fields.contains_key("phone"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let tenant = SurrealTenantRepository::new(h.db.clone()).get("user_a").await.unwrap();
    assert!(!tenant.onboarding_complete);
    assert!(!h.identity.principal("user_a").unwrap().onboarding_complete());
}

#[tokio::test]
async fn touch_repairs_metadata_from_the_durable_record() {
    let h = setup().await;
    h.directory.touch("user_a", None).await.unwrap();

    h.identity.fail_patches(Some("provider down"));
    let err = h
        .directory
        .complete_onboarding("user_a", &onboarding("Café Luz"))
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Upstream { .. }));
    assert!(!h.identity.principal("user_a").unwrap().onboarding_complete());

    // A touch while the provider is still failing must not fail.
    let tenant = h.directory.touch("user_a", None).await.unwrap();
    assert!(tenant.onboarding_complete);

    h.identity.fail_patches(None);
    h.directory.touch_principal("user_a").await.unwrap();

    let principal = h.identity.principal("user_a").unwrap();
    assert!(principal.onboarding_complete());
    assert_eq!(principal.metadata_str(keys::STORE_PATH), Some("/cafe-luz"));
}

#[tokio::test]
async fn touch_backfills_tenants_onboarded_only_in_metadata() {
    let h = setup().await;
    let mut metadata = Metadata::new();
    metadata.insert(keys::ONBOARDING_COMPLETE.into(), true.into());
    metadata.insert(keys::BRAND_NAME.into(), "Bar Norte".into());
    metadata.insert(keys::FULL_NAME.into(), "Marta de la Cruz".into());
    metadata.insert(keys::PHONE.into(), "1144443333".into());
    h.identity.insert(Principal {
        id: "user_legacy".into(),
        email: Some("marta@example.com".into()),
        metadata,
    });

    let tenant = h.directory.touch_principal("user_legacy").await.unwrap();

    assert!(tenant.onboarding_complete);
    assert_eq!(tenant.brand_slug.as_deref(), Some("bar-norte"));
    assert_eq!(tenant.first_name.as_deref(), Some("Marta"));
    assert_eq!(tenant.last_name.as_deref(), Some("de la Cruz"));
    assert_eq!(tenant.email.as_deref(), Some("marta@example.com"));
    assert!(h.directory.find_public_profile("bar-norte").await.unwrap().is_some());
}

#[tokio::test]
async fn update_profile_requires_onboarding() {
    let h = setup().await;
    h.directory.touch("user_a", None).await.unwrap();

    let input = PersonalDataInput {
        first_name: "Lucia".into(),
        last_name: "Gomez".into(),
        phone: "1155550000".into(),
        address: "Calle 123".into(),
    };
    let err = h.directory.update_profile("user_a", &input).await.unwrap_err();
    assert!(matches!(err, MiPropinaError::Validation { .. }));
}

#[tokio::test]
async fn update_profile_writes_record_and_metadata() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;

    let input = PersonalDataInput {
        first_name: " Lucía ".into(),
        last_name: "Gómez".into(),
        phone: "1155559999".into(),
        address: "Calle Falsa 123".into(),
    };
    let profile = h.directory.update_profile("user_a", &input).await.unwrap();

    assert_eq!(profile.first_name.as_deref(), Some("Lucía"));
    assert_eq!(profile.phone.as_deref(), Some("1155559999"));
    assert_eq!(profile.brand_name.as_deref(), Some("Café Luz"));

    let principal = h.identity.principal("user_a").unwrap();
    assert_eq!(principal.metadata_str(keys::FULL_NAME), Some("Lucía Gómez"));
    assert_eq!(principal.metadata_str(keys::ADDRESS), Some("Calle Falsa 123"));

    let stored = h.directory.profile("user_a").await.unwrap();
    assert_eq!(stored, profile);
}

#[tokio::test]
async fn more_than_five_features_leave_config_unchanged() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;

    let saved = h
        .directory
        .update_rating_config(
            "user_a",
            &["Limpieza".into(), "  ".into(), " Atención ".into()],
        )
        .await
        .unwrap();
    assert_eq!(saved.features, vec!["Limpieza", "Atención"]);

    let too_many: Vec<String> = (1..=6).map(|i| format!("Item {i}")).collect();
    let err = h
        .directory
        .update_rating_config("user_a", &too_many)
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Validation { .. }));

    let current = h.directory.rating_config("user_a").await.unwrap();
    assert_eq!(current, vec!["Limpieza", "Atención"]);
}

#[tokio::test]
async fn payment_link_must_be_mercadopago_host() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;

    let mut input = waiter("Juan", "Perez");
    input.payment_link = "https://evil.com/mercadopago.com".into();
    let err = h
        .directory
        .create_employee("user_a", &input, EmployeePhoto::None)
        .await
        .unwrap_err();

    match err {
        MiPropinaError::Validation { fields, .. } => {
            assert!(fields.contains_key("mercadopagoLink"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.directory.list_employees("user_a").await.unwrap().is_empty());
}

#[tokio::test]
async fn employees_of_another_owner_are_not_found() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;
    onboarded(&h, "user_b", "Bar Norte").await;

    let juan = h
        .directory
        .create_employee("user_a", &waiter("Juan", "Perez"), EmployeePhoto::None)
        .await
        .unwrap();

    let err = h
        .directory
        .update_employee("user_b", juan.id, &waiter("Pedro", "Paz"), EmployeePhoto::None)
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::NotFound { .. }));

    let err = h.directory.delete_employee("user_b", juan.id).await.unwrap_err();
    assert!(matches!(err, MiPropinaError::NotFound { .. }));

    let roster = h.directory.list_employees("user_a").await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].first_name, "Juan");
    assert!(h.directory.list_employees("user_b").await.unwrap().is_empty());

    h.directory.delete_employee("user_a", juan.id).await.unwrap();
    assert!(h.directory.list_employees("user_a").await.unwrap().is_empty());
}

#[tokio::test]
async fn employee_photo_is_uploaded_under_the_brand() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;

    let photo = EmployeePhoto::from_field(Some("data:image/png;base64,aGVsbG8=")).unwrap();
    let juan = h
        .directory
        .create_employee("user_a", &waiter("Juan", "Perez"), photo)
        .await
        .unwrap();

    let url = juan.photo_url.clone().unwrap();
    let prefix = "http://localhost:3000/assets/brand-assets/mipropina/cafe-luz/employee/foto/foto-";
    assert!(url.starts_with(prefix), "{url}");
    assert!(url.ends_with(".png"));

    let relative = url.trim_start_matches("http://localhost:3000/assets/");
    let bytes = std::fs::read(h.assets.path().join(relative)).unwrap();
    assert_eq!(bytes, b"hello");

    // The stored URL may be kept; a foreign one may not.
    let kept = h
        .directory
        .update_employee(
            "user_a",
            juan.id,
            &waiter("Juan", "Perez"),
            EmployeePhoto::Existing(url.clone()),
        )
        .await
        .unwrap();
    assert_eq!(kept.photo_url.as_deref(), Some(url.as_str()));

    let err = h
        .directory
        .update_employee(
            "user_a",
            juan.id,
            &waiter("Juan", "Perez"),
            EmployeePhoto::Existing("https://evil.example/x.png".into()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Validation { .. }));

    let cleared = h
        .directory
        .update_employee("user_a", juan.id, &waiter("Juan", "Perez"), EmployeePhoto::None)
        .await
        .unwrap();
    assert!(cleared.photo_url.is_none());
}

#[tokio::test]
async fn employee_photo_needs_a_brand() {
    let h = setup().await;
    h.directory.touch("user_a", None).await.unwrap();

    let photo = EmployeePhoto::from_field(Some("data:image/png;base64,aGVsbG8=")).unwrap();
    let err = h
        .directory
        .create_employee("user_a", &waiter("Juan", "Perez"), photo)
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Validation { .. }));
}

#[tokio::test]
async fn logo_is_stored_and_recorded() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;
    assert_eq!(h.directory.logo("user_a").await.unwrap(), None);

    let upload =
        ImageUpload::from_file(b"png-bytes".to_vec(), "image/png", Some("Mi Logo.PNG".into()))
            .unwrap();
    let url = h.directory.set_logo("user_a", upload).await.unwrap();

    assert_eq!(
        url,
        "http://localhost:3000/assets/brand-assets/mipropina/cafe-luz/mi-logo.png"
    );
    assert_eq!(h.directory.logo("user_a").await.unwrap(), Some(url.clone()));
    let on_disk = h
        .assets
        .path()
        .join("brand-assets/mipropina/cafe-luz/mi-logo.png");
    assert_eq!(std::fs::read(on_disk).unwrap(), b"png-bytes");

    let profile = h.directory.find_public_profile("cafe-luz").await.unwrap().unwrap();
    assert_eq!(profile.logo_url, Some(url));
}

#[tokio::test]
async fn rating_summary_averages_each_feature() {
    use mipropina_core::validation::validate_rating_submission;

    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;
    h.directory
        .update_rating_config("user_a", &["Limpieza".into(), "Atención".into()])
        .await
        .unwrap();

    for stars in [[Some(5.0), Some(4.0)], [Some(3.0), Some(2.0)]] {
        let data = validate_rating_submission(2, &stars, None)
            .into_result()
            .unwrap();
        h.directory.record_rating("cafe-luz", data).await.unwrap();
    }

    let summary = h
        .directory
        .rating_summary("user_a", Pagination::default())
        .await
        .unwrap();
    assert_eq!(summary.features, vec!["Limpieza", "Atención"]);
    assert_eq!(summary.submissions.total, 2);
    assert_eq!(summary.averages[0].average, Some(4.0));
    assert_eq!(summary.averages[1].average, Some(3.0));
}

#[tokio::test]
async fn removing_a_principal_cascades() {
    let h = setup().await;
    onboarded(&h, "user_a", "Café Luz").await;
    h.directory
        .create_employee("user_a", &waiter("Juan", "Perez"), EmployeePhoto::None)
        .await
        .unwrap();

    h.directory.remove_principal("user_a").await.unwrap();

    assert!(h.directory.find_public_profile("cafe-luz").await.unwrap().is_none());
    assert!(h.directory.list_employees("user_a").await.unwrap().is_empty());
    assert!(h.directory.rating_config("user_a").await.unwrap().is_empty());

    // The brand is free again.
    onboarded(&h, "user_b", "Café Luz").await;
    let profile = h.directory.profile("user_b").await.unwrap();
    assert_eq!(profile.brand_slug.as_deref(), Some("cafe-luz"));
}

#[tokio::test]
async fn concurrent_onboarding_of_one_owner_keeps_slugs_unique() {
    let h = setup().await;
    h.directory.touch("user_a", None).await.unwrap();

    let input_a = onboarding("Brand A");
    let input_b = onboarding("Brand B");
    let (brand_a, brand_b) = tokio::join!(
        h.directory.complete_onboarding("user_a", &input_a),
        h.directory.complete_onboarding("user_a", &input_b),
    );
    assert!(
        brand_a.is_ok() != brand_b.is_ok(),
        "exactly one attempt should win: {brand_a:?} / {brand_b:?}"
    );

    let stored = SurrealTenantRepository::new(h.db.clone()).get("user_a").await.unwrap();
    let (winner, loser) = match stored.brand_slug.as_deref() {
        Some("brand-a") => ("Brand A", "Brand B"),
        Some("brand-b") => ("Brand B", "Brand A"),
        other => panic!("unexpected brand slug {other:?}"),
    };

    // The winning slug stays with user_a; the losing one is free again.
    h.directory.touch("user_b", None).await.unwrap();
    let err = h
        .directory
        .complete_onboarding("user_b", &onboarding(winner))
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Conflict { .. }));
    h.directory
        .complete_onboarding("user_b", &onboarding(loser))
        .await
        .unwrap();

    for slug in ["brand-a", "brand-b"] {
        let mut response = h
            .db
            .query("SELECT VALUE meta::id(id) FROM tenant WHERE brand_slug = $slug")
            .bind(("slug", slug))
            .await
            .unwrap();
        let holders: Vec<String> = response.take(0).unwrap();
        assert_eq!(holders.len(), 1, "{slug} held by {holders:?}");
    }
}
