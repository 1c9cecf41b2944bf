//! Identity-layer error types.

use mipropina_core::error::MiPropinaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("session token has expired")]
    TokenExpired,

    #[error("invalid session token: {0}")]
    TokenInvalid(String),

    #[error("invalid webhook signature")]
    SignatureInvalid,

    #[error("webhook timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("malformed webhook: {0}")]
    MalformedWebhook(String),

    #[error("principal not found: {0}")]
    PrincipalNotFound(String),

    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<IdentityError> for MiPropinaError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::TokenExpired
            | IdentityError::TokenInvalid(_)
            | IdentityError::SignatureInvalid
            | IdentityError::TimestampOutOfTolerance => MiPropinaError::Unauthorized,
            IdentityError::MalformedWebhook(msg) => MiPropinaError::MalformedPayload(msg),
            IdentityError::PrincipalNotFound(id) => MiPropinaError::not_found("principal", id),
            err @ (IdentityError::Http(_) | IdentityError::UpstreamStatus { .. }) => {
                MiPropinaError::Upstream {
                    service: "identity".into(),
                    message: err.to_string(),
                }
            }
            IdentityError::Crypto(msg) => MiPropinaError::Internal(msg),
        }
    }
}
