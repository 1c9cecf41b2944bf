//! Repository trait definitions for the record store.
//!
//! All repository operations are async. Owner-scoped repositories take
//! the owning principal id as an explicit parameter and embed it in the
//! query predicate, so a principal can never read or mutate another
//! tenant's rows.

use uuid::Uuid;

use crate::error::MiPropinaResult;
use crate::models::{
    employee::{CreateEmployee, Employee, UpdateEmployee},
    rating::{CreateRatingSubmission, RatingConfig, RatingSubmission, Scores},
    tenant::{CompleteOnboarding, Tenant, UpdateTenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenants (global scope, keyed by principal id)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    /// Create the tenant shell if absent, otherwise refresh `email` and
    /// `last_seen_at`. A single conditional write: concurrent calls for
    /// the same principal never produce two records.
    fn touch(
        &self,
        principal_id: &str,
        email: Option<&str>,
    ) -> impl Future<Output = MiPropinaResult<Tenant>> + Send;

    fn get(&self, principal_id: &str) -> impl Future<Output = MiPropinaResult<Tenant>> + Send;

    /// Look up a tenant by brand slug. `Ok(None)` when nothing matches.
    fn find_by_slug(
        &self,
        brand_slug: &str,
    ) -> impl Future<Output = MiPropinaResult<Option<Tenant>>> + Send;

    /// Reserve `brand_slug` for `principal_id`.
    ///
    /// Succeeds when the slug is free or already held by the same
    /// principal; fails with `Conflict` when another principal holds it.
    fn claim_slug(
        &self,
        principal_id: &str,
        brand_slug: &str,
    ) -> impl Future<Output = MiPropinaResult<()>> + Send;

    /// Write the brand and personal data, unless the tenant is already
    /// onboarded, and release the principal's claims on any other slug.
    ///
    /// Returns the tenant as stored afterwards: a tenant that was already
    /// onboarded comes back unchanged, with its original brand.
    fn complete_onboarding(
        &self,
        principal_id: &str,
        input: CompleteOnboarding,
    ) -> impl Future<Output = MiPropinaResult<Tenant>> + Send;

    fn update(
        &self,
        principal_id: &str,
        input: UpdateTenant,
    ) -> impl Future<Output = MiPropinaResult<Tenant>> + Send;

    /// Delete the tenant together with its employees, rating
    /// configuration and slug claim. Rating submissions are kept.
    fn delete(&self, principal_id: &str) -> impl Future<Output = MiPropinaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Owner-scoped repositories
// ---------------------------------------------------------------------------

pub trait EmployeeRepository: Send + Sync {
    fn create(&self, input: CreateEmployee) -> impl Future<Output = MiPropinaResult<Employee>> + Send;

    fn get(
        &self,
        owner_id: &str,
        id: Uuid,
    ) -> impl Future<Output = MiPropinaResult<Employee>> + Send;

    /// Newest first.
    fn list_by_owner(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = MiPropinaResult<Vec<Employee>>> + Send;

    /// `NotFound` unless `id` exists and belongs to `owner_id`.
    fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        input: UpdateEmployee,
    ) -> impl Future<Output = MiPropinaResult<Employee>> + Send;

    /// `NotFound` unless `id` exists and belongs to `owner_id`.
    fn delete(&self, owner_id: &str, id: Uuid) -> impl Future<Output = MiPropinaResult<()>> + Send;
}

pub trait RatingConfigRepository: Send + Sync {
    fn get(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = MiPropinaResult<Option<RatingConfig>>> + Send;

    /// Replace the whole feature list.
    fn replace(
        &self,
        owner_id: &str,
        features: Vec<String>,
    ) -> impl Future<Output = MiPropinaResult<RatingConfig>> + Send;
}

pub trait RatingSubmissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRatingSubmission,
    ) -> impl Future<Output = MiPropinaResult<RatingSubmission>> + Send;

    /// Newest first.
    fn list_by_tenant(
        &self,
        tenant_id: &str,
        pagination: Pagination,
    ) -> impl Future<Output = MiPropinaResult<PaginatedResult<RatingSubmission>>> + Send;

    /// Score arrays of every submission for the tenant.
    fn scores_by_tenant(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = MiPropinaResult<Vec<Scores>>> + Send;
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// All record store repositories behind one handle.
pub trait RecordStore: Send + Sync {
    type Tenants: TenantRepository;
    type Employees: EmployeeRepository;
    type RatingConfigs: RatingConfigRepository;
    type RatingSubmissions: RatingSubmissionRepository;

    fn tenants(&self) -> &Self::Tenants;
    fn employees(&self) -> &Self::Employees;
    fn rating_configs(&self) -> &Self::RatingConfigs;
    fn rating_submissions(&self) -> &Self::RatingSubmissions;
}
