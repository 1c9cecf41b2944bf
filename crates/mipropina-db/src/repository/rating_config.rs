//! SurrealDB implementation of [`RatingConfigRepository`].

use chrono::{DateTime, Utc};
use mipropina_core::error::MiPropinaResult;
use mipropina_core::models::rating::RatingConfig;
use mipropina_core::repository::RatingConfigRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RatingConfigRow {
    owner_id: String,
    features: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl From<RatingConfigRow> for RatingConfig {
    fn from(row: RatingConfigRow) -> Self {
        RatingConfig {
            owner_id: row.owner_id,
            features: row.features,
            updated_at: row.updated_at,
        }
    }
}

/// SurrealDB implementation of the rating configuration repository.
///
/// One row per owner, keyed by the owner's principal id.
#[derive(Clone)]
pub struct SurrealRatingConfigRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRatingConfigRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RatingConfigRepository for SurrealRatingConfigRepository<C> {
    async fn get(&self, owner_id: &str) -> MiPropinaResult<Option<RatingConfig>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('rating_config', $owner_id)")
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RatingConfigRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(RatingConfig::from))
    }

    async fn replace(&self, owner_id: &str, features: Vec<String>) -> MiPropinaResult<RatingConfig> {
        let result = self
            .db
            .query(
                "UPSERT type::record('rating_config', $owner_id) SET \
                 owner_id = $owner_id, features = $features, \
                 updated_at = time::now()",
            )
            .bind(("owner_id", owner_id.to_string()))
            .bind(("features", features))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<RatingConfigRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "rating_config".into(),
            id: owner_id.to_string(),
        })?;

        Ok(row.into())
    }
}
