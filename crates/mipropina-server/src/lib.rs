//! MiPropina HTTP surface.
//!
//! Owner routes live under `/api/admin` and `/api/onboarding` and require
//! a bearer session token; store pages read `/api/public/{brand_slug}`
//! without one. Uploaded assets are served from `/assets`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use mipropina_db::repository::SurrealRecordStore;
use mipropina_db::{DbManager, FsBlobStore};
use mipropina_identity::{IdentityBackend, SessionVerifier, WebhookVerifier};
use mipropina_tenancy::{AssetUploadMediator, PublicResolutionService, TenantDirectory};
use surrealdb::engine::any::Any;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ServerConfig;

/// The tenant directory as wired in production.
pub type Directory = TenantDirectory<SurrealRecordStore<Any>, IdentityBackend, FsBlobStore>;

/// Shared application state
pub struct AppState {
    pub directory: Arc<Directory>,
    pub public: PublicResolutionService<Directory>,
    pub sessions: SessionVerifier,
    /// `None` disables the identity webhook.
    pub webhooks: Option<WebhookVerifier>,
    /// Directory served under `/assets`.
    pub assets_root: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        directory: Directory,
        sessions: SessionVerifier,
        webhooks: Option<WebhookVerifier>,
        assets_root: PathBuf,
        max_upload_bytes: usize,
    ) -> Self {
        let directory = Arc::new(directory);
        Self {
            public: PublicResolutionService::new(Arc::clone(&directory)),
            directory,
            sessions,
            webhooks,
            assets_root,
            max_upload_bytes,
        }
    }
}

/// Connect every collaborator described by `config`.
pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let db = DbManager::connect(&config.db)
        .await
        .context("Failed to connect to SurrealDB")?;

    let identity =
        IdentityBackend::from_config(&config.identity).context("Failed to set up identity gateway")?;
    let sessions =
        SessionVerifier::new(&config.identity).context("Invalid session verification key")?;
    let webhooks = match &config.identity.webhook_secret {
        Some(secret) => Some(
            WebhookVerifier::new(secret, config.identity.webhook_tolerance_secs)
                .context("Invalid webhook secret")?,
        ),
        None => {
            info!("no webhook secret configured, identity webhook disabled");
            None
        }
    };

    let store = FsBlobStore::from_config(&config.storage);
    let assets = AssetUploadMediator::new(
        store,
        config.storage.bucket.clone(),
        config.storage.prefix.clone(),
    );
    let directory = TenantDirectory::new(
        SurrealRecordStore::new(db.client().clone()),
        identity,
        assets,
    );

    Ok(AppState::new(
        directory,
        sessions,
        webhooks,
        config.storage.root.clone(),
        config.max_upload_bytes,
    ))
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.assets_root);
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/onboarding", post(handlers::admin::onboarding_handler))
        .route(
            "/api/admin/personal-data",
            get(handlers::admin::get_personal_data_handler)
                .patch(handlers::admin::update_personal_data_handler),
        )
        .route(
            "/api/admin/rating-config",
            get(handlers::admin::get_rating_config_handler)
                .patch(handlers::admin::update_rating_config_handler),
        )
        .route("/api/admin/ratings", get(handlers::admin::ratings_handler))
        .route(
            "/api/admin/logo",
            get(handlers::admin::get_logo_handler).post(handlers::admin::upload_logo_handler),
        )
        .route(
            "/api/admin/waiters",
            get(handlers::waiters::list_waiters_handler)
                .post(handlers::waiters::create_waiter_handler),
        )
        .route(
            "/api/admin/waiters/{waiter_id}",
            patch(handlers::waiters::update_waiter_handler)
                .delete(handlers::waiters::delete_waiter_handler),
        )
        .route(
            "/api/public/{brand_slug}/waiters",
            get(handlers::public::public_store_handler),
        )
        .route(
            "/api/public/{brand_slug}/rating",
            post(handlers::public::submit_rating_handler),
        )
        .route(
            "/api/webhooks/identity",
            post(handlers::webhook::identity_webhook_handler),
        )
        .nest_service("/assets", assets)
        .with_state(shared_state)
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
