//! Authenticated owner extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use mipropina_core::error::MiPropinaError;
use mipropina_core::models::principal::PrincipalId;
use mipropina_core::models::tenant::Tenant;
use mipropina_identity::token::bearer_token;

use crate::AppState;
use crate::error::ApiError;

/// The principal behind `Authorization: Bearer <session token>`.
///
/// Extraction verifies the token and touches the principal's tenant, so
/// every authenticated handler runs against an existing tenant record.
#[derive(Debug, Clone)]
pub struct Owner {
    pub principal_id: PrincipalId,
    pub tenant: Tenant,
}

impl FromRequestParts<Arc<AppState>> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal_id = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .and_then(|token| state.sessions.authenticate(token))
            .ok_or(MiPropinaError::Unauthorized)?;

        let tenant = state.directory.touch_principal(&principal_id).await?;
        Ok(Self {
            principal_id,
            tenant,
        })
    }
}
