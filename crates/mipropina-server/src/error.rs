//! HTTP error envelope.
//!
//! Every failure is rendered as
//! `{"ok": false, "error": "<message>", "correlationId": "<uuid>"}`.
//! Validation failures also carry the per-field reasons under `fields`.
//! The correlation id is logged together with the internal detail, which
//! never reaches the client for 5xx responses.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mipropina_core::error::MiPropinaError;
use mipropina_core::validation::FieldErrors;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

const UNAUTHORIZED: &str = "Unauthorized";
const NOT_FOUND: &str = "No se encontro el recurso solicitado.";
const UPSTREAM: &str = "Un servicio externo no respondio. Intenta nuevamente.";
const INTERNAL: &str = "Ocurrio un error inesperado.";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub fields: Option<FieldErrors>,
    pub correlation_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    ok: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a FieldErrors>,
    correlation_id: Uuid,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            error: &self.message,
            fields: self.fields.as_ref(),
            correlation_id: self.correlation_id,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<MiPropinaError> for ApiError {
    fn from(err: MiPropinaError) -> Self {
        let correlation_id = Uuid::new_v4();
        let (status, message, fields) = match err {
            MiPropinaError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED.to_string(), None),
            MiPropinaError::Validation { message, fields } => {
                (StatusCode::BAD_REQUEST, message, Some(fields))
            }
            MiPropinaError::MalformedPayload(message) => (StatusCode::BAD_REQUEST, message, None),
            MiPropinaError::NotFound { entity, id } => {
                warn!(%correlation_id, %entity, %id, "not found");
                (StatusCode::NOT_FOUND, NOT_FOUND.to_string(), None)
            }
            MiPropinaError::Conflict { message } => (StatusCode::CONFLICT, message, None),
            MiPropinaError::Upstream { service, message } => {
                error!(%correlation_id, %service, detail = %message, "upstream failure");
                (StatusCode::BAD_GATEWAY, UPSTREAM.to_string(), None)
            }
            MiPropinaError::Internal(detail) => {
                error!(%correlation_id, %detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string(), None)
            }
        };

        Self {
            status,
            message,
            fields,
            correlation_id,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request("El cuerpo de la solicitud no es valido.")
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected multipart request");
        MiPropinaError::MalformedPayload(crate::handlers::admin::FILE_REQUIRED.into()).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected query string");
        Self::bad_request("Los parametros de la consulta no son validos.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (MiPropinaError::Unauthorized, StatusCode::UNAUTHORIZED),
            (MiPropinaError::invalid("phone", "Telefono invalido"), StatusCode::BAD_REQUEST),
            (MiPropinaError::MalformedPayload("x".into()), StatusCode::BAD_REQUEST),
            (MiPropinaError::not_found("employee", "1"), StatusCode::NOT_FOUND),
            (
                MiPropinaError::Conflict {
                    message: "taken".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                MiPropinaError::Upstream {
                    service: "identity".into(),
                    message: "timeout".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (MiPropinaError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let api = ApiError::from(MiPropinaError::Internal("db password wrong".into()));
        assert!(!api.message.contains("password"));
    }

    #[test]
    fn validation_keeps_field_reasons() {
        let api = ApiError::from(MiPropinaError::invalid("phone", "Telefono invalido"));
        assert_eq!(api.message, "Telefono invalido");
        assert_eq!(
            api.fields.unwrap().get("phone").map(String::as_str),
            Some("Telefono invalido")
        );
    }
}
