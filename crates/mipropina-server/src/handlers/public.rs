//! Unauthenticated store page endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use mipropina_core::models::employee::PublicWaiter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDto {
    pub brand_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicWaiterDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_initial: Option<String>,
    pub display_name: String,
    pub mercadopago_link: String,
    pub photo: Option<String>,
}

impl From<PublicWaiter> for PublicWaiterDto {
    fn from(w: PublicWaiter) -> Self {
        Self {
            id: w.id,
            first_name: w.first_name,
            last_initial: w.last_initial,
            display_name: w.display_name,
            mercadopago_link: w.payment_link,
            photo: w.photo_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStoreResponse {
    pub ok: bool,
    pub store: StoreDto,
    pub rating_features: Vec<String>,
    pub waiters: Vec<PublicWaiterDto>,
}

pub async fn public_store_handler(
    State(state): State<Arc<AppState>>,
    Path(brand_slug): Path<String>,
) -> Result<Json<PublicStoreResponse>, ApiError> {
    let bundle = state.public.resolve(&brand_slug).await?;

    let store = bundle
        .profile
        .map(|p| StoreDto {
            brand_name: Some(p.brand_name),
            phone: p.phone,
            address: p.address,
            logo: p.logo_url,
        })
        .unwrap_or_default();

    Ok(Json(PublicStoreResponse {
        ok: true,
        store,
        rating_features: bundle.rating_features,
        waiters: bundle.waiters.into_iter().map(PublicWaiterDto::from).collect(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RatingRequest {
    pub stars: Value,
    pub comment: Option<Value>,
}

/// Read `stars` leniently: numbers and numeric strings are scores,
/// anything else is an unset slot. A non-array is no scores at all.
fn read_stars(value: &Value) -> Vec<Option<f64>> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .map(|score| score.filter(|s| s.is_finite()))
        .collect()
}

pub async fn submit_rating_handler(
    State(state): State<Arc<AppState>>,
    Path(brand_slug): Path<String>,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let stars = read_stars(&payload.stars);
    let comment = payload.comment.as_ref().and_then(Value::as_str);

    let submission = state
        .public
        .submit_rating(&brand_slug, &stars, comment)
        .await?;

    info!(brand_slug = %brand_slug, submission_id = %submission.id, "public rating accepted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
