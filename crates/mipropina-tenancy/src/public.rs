//! Unauthenticated reads and rating intake, addressed by brand slug.

use std::sync::Arc;

use mipropina_core::error::MiPropinaResult;
use mipropina_core::gateway::{BlobStore, IdentityGateway};
use mipropina_core::models::employee::PublicWaiter;
use mipropina_core::models::rating::RatingSubmission;
use mipropina_core::models::tenant::PublicProfile;
use mipropina_core::repository::RecordStore;
use mipropina_core::validation::{RatingSubmissionData, validate_rating_submission};
use tracing::debug;

use crate::directory::TenantDirectory;

/// Slug-addressed lookups that need no principal.
///
/// Each lookup resolves the slug on its own and returns its empty form
/// when nothing matches.
pub trait PublicLookup: Send + Sync {
    fn public_profile(
        &self,
        brand_slug: &str,
    ) -> impl Future<Output = MiPropinaResult<Option<PublicProfile>>> + Send;

    fn public_waiters(
        &self,
        brand_slug: &str,
    ) -> impl Future<Output = MiPropinaResult<Vec<PublicWaiter>>> + Send;

    fn rating_features(
        &self,
        brand_slug: &str,
    ) -> impl Future<Output = MiPropinaResult<Vec<String>>> + Send;

    /// `NotFound` when the slug does not resolve.
    fn record_rating(
        &self,
        brand_slug: &str,
        data: RatingSubmissionData,
    ) -> impl Future<Output = MiPropinaResult<RatingSubmission>> + Send;
}

impl<R: RecordStore, I: IdentityGateway, B: BlobStore> PublicLookup for TenantDirectory<R, I, B> {
    async fn public_profile(&self, brand_slug: &str) -> MiPropinaResult<Option<PublicProfile>> {
        self.find_public_profile(brand_slug).await
    }

    async fn public_waiters(&self, brand_slug: &str) -> MiPropinaResult<Vec<PublicWaiter>> {
        TenantDirectory::public_waiters(self, brand_slug).await
    }

    async fn rating_features(&self, brand_slug: &str) -> MiPropinaResult<Vec<String>> {
        self.rating_features_by_slug(brand_slug).await
    }

    async fn record_rating(
        &self,
        brand_slug: &str,
        data: RatingSubmissionData,
    ) -> MiPropinaResult<RatingSubmission> {
        TenantDirectory::record_rating(self, brand_slug, data).await
    }
}

/// Everything the public store page needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicBundle {
    /// `None` when the slug does not resolve to an onboarded tenant.
    pub profile: Option<PublicProfile>,
    pub waiters: Vec<PublicWaiter>,
    pub rating_features: Vec<String>,
}

pub struct PublicResolutionService<L: PublicLookup> {
    lookup: Arc<L>,
}

impl<L: PublicLookup> Clone for PublicResolutionService<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: Arc::clone(&self.lookup),
        }
    }
}

impl<L: PublicLookup> PublicResolutionService<L> {
    pub fn new(lookup: Arc<L>) -> Self {
        Self { lookup }
    }

    /// Aggregate the public bundle for `brand_slug`. An unknown slug is
    /// an empty bundle, not an error.
    pub async fn resolve(&self, brand_slug: &str) -> MiPropinaResult<PublicBundle> {
        let (profile, waiters, rating_features) = tokio::join!(
            self.lookup.public_profile(brand_slug),
            self.lookup.public_waiters(brand_slug),
            self.lookup.rating_features(brand_slug),
        );

        let bundle = PublicBundle {
            profile: profile?,
            waiters: waiters?,
            rating_features: rating_features?,
        };
        debug!(
            brand_slug,
            found = bundle.profile.is_some(),
            waiters = bundle.waiters.len(),
            "public bundle resolved"
        );
        Ok(bundle)
    }

    /// Validate `stars` against the brand's current features and store
    /// the rating. Nothing is written when validation fails.
    pub async fn submit_rating(
        &self,
        brand_slug: &str,
        stars: &[Option<f64>],
        comment: Option<&str>,
    ) -> MiPropinaResult<RatingSubmission> {
        let features = self.lookup.rating_features(brand_slug).await?;
        let data = validate_rating_submission(features.len(), stars, comment).into_result()?;
        self.lookup.record_rating(brand_slug, data).await
    }
}
