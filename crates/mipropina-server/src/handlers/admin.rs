//! Owner endpoints: onboarding, personal data, logo and ratings.

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use chrono::{DateTime, Utc};
use mipropina_core::error::MiPropinaError;
use mipropina_core::models::rating::FeatureAverage;
use mipropina_core::repository::Pagination;
use mipropina_core::validation::{OnboardingInput, PersonalDataInput};
use mipropina_tenancy::{ImageUpload, OwnerProfile};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::Owner;
use crate::error::ApiError;

const MAX_PAGE_SIZE: u64 = 100;
pub(crate) const FILE_REQUIRED: &str = "Selecciona un archivo de imagen.";

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnboardingRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub brand_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResponse {
    pub ok: bool,
    pub brand_name: Option<String>,
    pub brand_slug: Option<String>,
    pub admin_path: Option<String>,
    pub store_path: Option<String>,
}

pub async fn onboarding_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    payload: Result<Json<OnboardingRequest>, JsonRejection>,
) -> Result<Json<OnboardingResponse>, ApiError> {
    let Json(payload) = payload?;
    let input = OnboardingInput {
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone: payload.phone,
        address: payload.address,
        brand_name: payload.brand_name,
    };

    let tenant = state
        .directory
        .complete_onboarding(&owner.principal_id, &input)
        .await?;

    Ok(Json(OnboardingResponse {
        ok: true,
        brand_name: tenant.brand_name,
        brand_slug: tenant.brand_slug,
        admin_path: tenant.admin_path,
        store_path: tenant.store_path,
    }))
}

// ---------------------------------------------------------------------------
// Personal data
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalDataRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDataResponse {
    pub ok: bool,
    pub personal_data: OwnerProfile,
}

pub async fn get_personal_data_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<Json<PersonalDataResponse>, ApiError> {
    let personal_data = state.directory.profile(&owner.principal_id).await?;
    Ok(Json(PersonalDataResponse {
        ok: true,
        personal_data,
    }))
}

pub async fn update_personal_data_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    payload: Result<Json<PersonalDataRequest>, JsonRejection>,
) -> Result<Json<PersonalDataResponse>, ApiError> {
    let Json(payload) = payload?;
    let input = PersonalDataInput {
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone: payload.phone,
        address: payload.address,
    };

    let personal_data = state
        .directory
        .update_profile(&owner.principal_id, &input)
        .await
        .map_err(|e| match e {
            // The per-field reasons stay attached; the summary is generic.
            MiPropinaError::Validation { fields, .. } if !fields.contains_key("onboarding") => {
                MiPropinaError::Validation {
                    message: "Revisa los datos personales.".into(),
                    fields,
                }
            }
            other => other,
        })?;

    Ok(Json(PersonalDataResponse {
        ok: true,
        personal_data,
    }))
}

// ---------------------------------------------------------------------------
// Rating configuration & received ratings
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RatingConfigRequest {
    pub features: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RatingConfigResponse {
    pub ok: bool,
    pub features: Vec<String>,
}

pub async fn get_rating_config_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<Json<RatingConfigResponse>, ApiError> {
    let features = state.directory.rating_config(&owner.principal_id).await?;
    Ok(Json(RatingConfigResponse { ok: true, features }))
}

pub async fn update_rating_config_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    payload: Result<Json<RatingConfigRequest>, JsonRejection>,
) -> Result<Json<RatingConfigResponse>, ApiError> {
    let Json(payload) = payload?;
    let config = state
        .directory
        .update_rating_config(&owner.principal_id, &payload.features)
        .await?;
    Ok(Json(RatingConfigResponse {
        ok: true,
        features: config.features,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RatingsQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDto {
    pub id: Uuid,
    pub stars: Vec<Option<u8>>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingsResponse {
    pub ok: bool,
    pub features: Vec<String>,
    pub averages: Vec<FeatureAverage>,
    pub submissions: Vec<SubmissionDto>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub async fn ratings_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    query: Result<Query<RatingsQuery>, QueryRejection>,
) -> Result<Json<RatingsResponse>, ApiError> {
    let Query(query) = query?;
    let defaults = Pagination::default();
    let pagination = Pagination {
        offset: query.offset.unwrap_or(defaults.offset),
        limit: query.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
    };

    let summary = state
        .directory
        .rating_summary(&owner.principal_id, pagination)
        .await?;

    // Only the slots of currently configured features are meaningful.
    let slots = summary.features.len();
    let submissions = summary
        .submissions
        .items
        .into_iter()
        .map(|s| SubmissionDto {
            id: s.id,
            stars: s.scores.iter().take(slots).copied().collect(),
            comment: s.comment,
            created_at: s.created_at,
        })
        .collect();

    Ok(Json(RatingsResponse {
        ok: true,
        features: summary.features,
        averages: summary.averages,
        submissions,
        total: summary.submissions.total,
        offset: summary.submissions.offset,
        limit: summary.submissions.limit,
    }))
}

// ---------------------------------------------------------------------------
// Logo
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoResponse {
    pub ok: bool,
    pub image_url: Option<String>,
}

pub async fn get_logo_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<Json<LogoResponse>, ApiError> {
    let image_url = state.directory.logo(&owner.principal_id).await?;
    Ok(Json(LogoResponse {
        ok: true,
        image_url,
    }))
}

/// Multipart upload; the image is the `file` part.
pub async fn upload_logo_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<LogoResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MiPropinaError::MalformedPayload(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| MiPropinaError::MalformedPayload(e.body_text()))?;
        upload = Some(ImageUpload::from_file(bytes.to_vec(), &content_type, file_name)?);
        break;
    }
    let upload = upload.ok_or_else(|| MiPropinaError::MalformedPayload(FILE_REQUIRED.into()))?;

    let url = state.directory.set_logo(&owner.principal_id, upload).await?;
    Ok(Json(LogoResponse {
        ok: true,
        image_url: Some(url),
    }))
}
