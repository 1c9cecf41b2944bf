//! Error types for the MiPropina system.

use thiserror::Error;

use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum MiPropinaError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        /// Field name (wire spelling) to reason.
        fields: FieldErrors,
    },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Upstream failure from {service}: {message}")]
    Upstream { service: String, message: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MiPropinaError {
    /// Build a validation error from a non-empty field map. The first
    /// reason (in field order) becomes the summary message.
    pub fn validation(fields: FieldErrors) -> Self {
        let message = fields
            .values()
            .next()
            .cloned()
            .unwrap_or_else(|| "invalid input".into());
        Self::Validation { message, fields }
    }

    /// Validation error that is not tied to a single field.
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), reason.into());
        Self::validation(fields)
    }

    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

pub type MiPropinaResult<T> = Result<T, MiPropinaError>;
