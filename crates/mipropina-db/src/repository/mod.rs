//! SurrealDB repository implementations.

mod employee;
mod rating_config;
mod rating_submission;
mod tenant;

use mipropina_core::repository::RecordStore;
use surrealdb::{Connection, Surreal};

pub use employee::SurrealEmployeeRepository;
pub use rating_config::SurrealRatingConfigRepository;
pub use rating_submission::SurrealRatingSubmissionRepository;
pub use tenant::SurrealTenantRepository;

/// Every SurrealDB repository sharing one client.
#[derive(Clone)]
pub struct SurrealRecordStore<C: Connection> {
    tenants: SurrealTenantRepository<C>,
    employees: SurrealEmployeeRepository<C>,
    rating_configs: SurrealRatingConfigRepository<C>,
    rating_submissions: SurrealRatingSubmissionRepository<C>,
}

impl<C: Connection> SurrealRecordStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            tenants: SurrealTenantRepository::new(db.clone()),
            employees: SurrealEmployeeRepository::new(db.clone()),
            rating_configs: SurrealRatingConfigRepository::new(db.clone()),
            rating_submissions: SurrealRatingSubmissionRepository::new(db),
        }
    }
}

impl<C: Connection> RecordStore for SurrealRecordStore<C> {
    type Tenants = SurrealTenantRepository<C>;
    type Employees = SurrealEmployeeRepository<C>;
    type RatingConfigs = SurrealRatingConfigRepository<C>;
    type RatingSubmissions = SurrealRatingSubmissionRepository<C>;

    fn tenants(&self) -> &Self::Tenants {
        &self.tenants
    }

    fn employees(&self) -> &Self::Employees {
        &self.employees
    }

    fn rating_configs(&self) -> &Self::RatingConfigs {
        &self.rating_configs
    }

    fn rating_submissions(&self) -> &Self::RatingSubmissions {
        &self.rating_submissions
    }
}
