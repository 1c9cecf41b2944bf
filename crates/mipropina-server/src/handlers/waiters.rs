//! Owner endpoints for the employee ("waiter") roster.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use mipropina_core::error::MiPropinaError;
use mipropina_core::models::employee::Employee;
use mipropina_core::validation::EmployeeInput;
use mipropina_tenancy::EmployeePhoto;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::AppState;
use crate::auth::Owner;
use crate::error::ApiError;

/// Create/update body. `image` is a `data:image/...` URL for a new
/// photo, the current photo URL to keep it, or blank/null to clear it.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaiterRequest {
    pub name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub mercadopago_link: String,
    pub image: Option<String>,
}

impl WaiterRequest {
    fn into_parts(self) -> Result<(EmployeeInput, EmployeePhoto), MiPropinaError> {
        let photo = EmployeePhoto::from_field(self.image.as_deref())?;
        let input = EmployeeInput {
            first_name: self.name,
            last_name: self.last_name,
            dni: self.dni,
            phone: self.phone,
            payment_link: self.mercadopago_link,
        };
        Ok((input, photo))
    }
}

/// Owner-side view of an employee, including the private fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub mercadopago_link: String,
    pub photo: Option<String>,
}

impl From<Employee> for WaiterDto {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            first_name: e.first_name,
            last_name: e.last_name,
            dni: e.dni,
            phone: e.phone,
            mercadopago_link: e.payment_link,
            photo: e.photo_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WaiterResponse {
    pub ok: bool,
    pub waiter: WaiterDto,
}

#[derive(Debug, Serialize)]
pub struct WaitersResponse {
    pub ok: bool,
    pub waiters: Vec<WaiterDto>,
}

/// Unparseable ids cannot belong to anyone.
fn parse_waiter_id(raw: &str) -> Result<Uuid, MiPropinaError> {
    Uuid::parse_str(raw.trim()).map_err(|_| MiPropinaError::not_found("employee", raw))
}

pub async fn list_waiters_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<Json<WaitersResponse>, ApiError> {
    let employees = state.directory.list_employees(&owner.principal_id).await?;
    Ok(Json(WaitersResponse {
        ok: true,
        waiters: employees.into_iter().map(WaiterDto::from).collect(),
    }))
}

pub async fn create_waiter_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    payload: Result<Json<WaiterRequest>, JsonRejection>,
) -> Result<Json<WaiterResponse>, ApiError> {
    let Json(payload) = payload?;
    let (input, photo) = payload.into_parts()?;

    let employee = state
        .directory
        .create_employee(&owner.principal_id, &input, photo)
        .await?;
    Ok(Json(WaiterResponse {
        ok: true,
        waiter: employee.into(),
    }))
}

pub async fn update_waiter_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Path(waiter_id): Path<String>,
    payload: Result<Json<WaiterRequest>, JsonRejection>,
) -> Result<Json<WaiterResponse>, ApiError> {
    let waiter_id = parse_waiter_id(&waiter_id)?;
    let Json(payload) = payload?;
    let (input, photo) = payload.into_parts()?;

    let employee = state
        .directory
        .update_employee(&owner.principal_id, waiter_id, &input, photo)
        .await?;
    Ok(Json(WaiterResponse {
        ok: true,
        waiter: employee.into(),
    }))
}

pub async fn delete_waiter_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Path(waiter_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let waiter_id = parse_waiter_id(&waiter_id)?;
    state
        .directory
        .delete_employee(&owner.principal_id, waiter_id)
        .await?;
    Ok(Json(json!({ "ok": true })))
}
