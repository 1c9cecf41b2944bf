//! Identity provider lifecycle webhook.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use mipropina_core::error::MiPropinaError;
use mipropina_identity::{IdentityEvent, WebhookHeaders};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;

const INVALID_WEBHOOK: &str = "Invalid webhook";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verify a signed delivery and apply it to the tenant directory.
///
/// `user.created`/`user.updated` touch the tenant, `user.deleted`
/// removes it, anything else is acknowledged and ignored.
pub async fn identity_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let verifier = state
        .webhooks
        .as_ref()
        .ok_or_else(|| MiPropinaError::Internal("webhook secret not configured".into()))?;

    let (Some(id), Some(timestamp), Some(signature)) = (
        header(&headers, "svix-id"),
        header(&headers, "svix-timestamp"),
        header(&headers, "svix-signature"),
    ) else {
        warn!("webhook delivery without signature headers");
        return Err(ApiError::bad_request(INVALID_WEBHOOK));
    };

    let signed = WebhookHeaders {
        id,
        timestamp,
        signature,
    };
    if let Err(e) = verifier.verify(signed, &body, Utc::now().timestamp()) {
        warn!(webhook_id = id, error = %e, "webhook rejected");
        return Err(ApiError::bad_request(INVALID_WEBHOOK));
    }

    let event = IdentityEvent::parse(&body).map_err(|e| {
        warn!(webhook_id = id, error = %e, "webhook payload rejected");
        ApiError::bad_request(INVALID_WEBHOOK)
    })?;

    match event {
        IdentityEvent::PrincipalUpserted(principal) => {
            state.directory.sync_principal(&principal).await?;
            info!(webhook_id = id, principal_id = %principal.id, "principal synced");
            Ok(Json(json!({ "ok": true })))
        }
        IdentityEvent::PrincipalDeleted(Some(principal_id)) => {
            state.directory.remove_principal(&principal_id).await?;
            Ok(Json(json!({ "ok": true })))
        }
        IdentityEvent::PrincipalDeleted(None) => {
            warn!(webhook_id = id, "user.deleted without id");
            Ok(Json(json!({ "ok": true })))
        }
        IdentityEvent::Ignored(kind) => Ok(Json(json!({ "ok": true, "ignored": kind }))),
    }
}
