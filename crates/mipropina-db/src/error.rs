//! Database-specific error types and conversions.

use mipropina_core::error::MiPropinaError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Brand slug already taken: {0}")]
    SlugTaken(String),

    #[error("Blob storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),
}

impl From<DbError> for MiPropinaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => MiPropinaError::NotFound { entity, id },
            DbError::SlugTaken(slug) => MiPropinaError::Conflict {
                message: format!("brand slug '{slug}' is already taken"),
            },
            DbError::InvalidPath(path) => {
                MiPropinaError::Internal(format!("invalid object path: {path}"))
            }
            err @ DbError::Storage(_) => MiPropinaError::Upstream {
                service: "blob-store".into(),
                message: err.to_string(),
            },
            other => MiPropinaError::Upstream {
                service: "record-store".into(),
                message: other.to_string(),
            },
        }
    }
}
