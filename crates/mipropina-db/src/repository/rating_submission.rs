//! SurrealDB implementation of [`RatingSubmissionRepository`].
//!
//! Scores are stored as the supplied prefix (`array<int>`) and padded
//! back to the fixed five slots on read.

use chrono::{DateTime, Utc};
use mipropina_core::error::MiPropinaResult;
use mipropina_core::models::rating::{
    CreateRatingSubmission, MAX_FEATURES, RatingSubmission, Scores,
};
use mipropina_core::repository::{PaginatedResult, Pagination, RatingSubmissionRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct RatingSubmissionRow {
    tenant_id: String,
    brand_slug: String,
    scores: Vec<i64>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct RatingSubmissionRowWithId {
    record_id: String,
    tenant_id: String,
    brand_slug: String,
    scores: Vec<i64>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ScoresRow {
    scores: Vec<i64>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn pack_scores(scores: &Scores) -> Vec<i64> {
    scores
        .iter()
        .map_while(|s| s.map(i64::from))
        .collect()
}

fn unpack_scores(stored: &[i64]) -> Result<Scores, DbError> {
    if stored.len() > MAX_FEATURES {
        return Err(DbError::Decode(format!(
            "rating submission has {} scores",
            stored.len()
        )));
    }
    let mut scores: Scores = [None; MAX_FEATURES];
    for (slot, value) in stored.iter().enumerate() {
        let score = u8::try_from(*value)
            .map_err(|_| DbError::Decode(format!("score out of range: {value}")))?;
        scores[slot] = Some(score);
    }
    Ok(scores)
}

impl RatingSubmissionRow {
    fn into_submission(self, id: Uuid) -> Result<RatingSubmission, DbError> {
        Ok(RatingSubmission {
            id,
            tenant_id: self.tenant_id,
            brand_slug: self.brand_slug,
            scores: unpack_scores(&self.scores)?,
            comment: self.comment,
            created_at: self.created_at,
        })
    }
}

impl RatingSubmissionRowWithId {
    fn try_into_submission(self) -> Result<RatingSubmission, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid submission UUID: {e}")))?;
        Ok(RatingSubmission {
            id,
            tenant_id: self.tenant_id,
            brand_slug: self.brand_slug,
            scores: unpack_scores(&self.scores)?,
            comment: self.comment,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the rating submission repository.
#[derive(Clone)]
pub struct SurrealRatingSubmissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRatingSubmissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RatingSubmissionRepository for SurrealRatingSubmissionRepository<C> {
    async fn create(&self, input: CreateRatingSubmission) -> MiPropinaResult<RatingSubmission> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('rating_submission', $id) SET \
                 tenant_id = $tenant_id, brand_slug = $brand_slug, \
                 scores = $scores, comment = $comment",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id))
            .bind(("brand_slug", input.brand_slug))
            .bind(("scores", pack_scores(&input.scores)))
            .bind(("comment", input.comment))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<RatingSubmissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "rating_submission".into(),
            id: id_str,
        })?;

        Ok(row.into_submission(id)?)
    }

    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        pagination: Pagination,
    ) -> MiPropinaResult<PaginatedResult<RatingSubmission>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM rating_submission \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM rating_submission \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RatingSubmissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(RatingSubmissionRowWithId::try_into_submission)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn scores_by_tenant(&self, tenant_id: &str) -> MiPropinaResult<Vec<Scores>> {
        let mut result = self
            .db
            .query("SELECT scores FROM rating_submission WHERE tenant_id = $tenant_id")
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScoresRow> = result.take(0).map_err(DbError::from)?;
        let scores = rows
            .iter()
            .map(|row| unpack_scores(&row.scores))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(scores)
    }
}
