//! SurrealDB implementation of [`TenantRepository`].
//!
//! Tenant records are keyed by the owning principal id, so creating the
//! shell is a single `UPSERT` on a known record id. Brand slug uniqueness
//! is held by a separate `brand_slug` table whose record ids are the slugs
//! themselves; a claim is only released once the tenant record settles on
//! another slug.

use chrono::{DateTime, Utc};
use mipropina_core::error::MiPropinaResult;
use mipropina_core::models::tenant::{CompleteOnboarding, Tenant, UpdateTenant};
use mipropina_core::repository::TenantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TenantRow {
    principal_id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    brand_name: Option<String>,
    brand_slug: Option<String>,
    admin_path: Option<String>,
    store_path: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    logo_url: Option<String>,
    onboarding_complete: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            principal_id: row.principal_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            brand_name: row.brand_name,
            brand_slug: row.brand_slug,
            admin_path: row.admin_path,
            store_path: row.store_path,
            phone: row.phone,
            address: row.address,
            logo_url: row.logo_url,
            onboarding_complete: row.onboarding_complete,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_seen_at: row.last_seen_at,
        }
    }
}

/// Holder of a brand slug.
#[derive(Debug, SurrealValue)]
struct SlugClaimRow {
    principal_id: String,
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn slug_holder(&self, brand_slug: &str) -> Result<Option<String>, DbError> {
        let mut result = self
            .db
            .query("SELECT principal_id FROM type::record('brand_slug', $slug)")
            .bind(("slug", brand_slug.to_string()))
            .await?;
        let rows: Vec<SlugClaimRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.principal_id))
    }

    fn single(rows: Vec<TenantRow>, principal_id: &str) -> Result<Tenant, DbError> {
        rows.into_iter()
            .next()
            .map(Tenant::from)
            .ok_or_else(|| DbError::NotFound {
                entity: "tenant".into(),
                id: principal_id.to_string(),
            })
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn touch(&self, principal_id: &str, email: Option<&str>) -> MiPropinaResult<Tenant> {
        let result = self
            .db
            .query(
                "UPSERT type::record('tenant', $principal_id) SET \
                 principal_id = $principal_id, \
                 email = $email ?? email, \
                 last_seen_at = time::now()",
            )
            .bind(("principal_id", principal_id.to_string()))
            .bind(("email", email.map(str::to_string)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;

        debug!(principal_id, "tenant touched");
        Ok(Self::single(rows, principal_id)?)
    }

    async fn get(&self, principal_id: &str) -> MiPropinaResult<Tenant> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $principal_id)")
            .bind(("principal_id", principal_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(Self::single(rows, principal_id)?)
    }

    async fn find_by_slug(&self, brand_slug: &str) -> MiPropinaResult<Option<Tenant>> {
        let mut result = self
            .db
            .query("SELECT * FROM tenant WHERE brand_slug = $brand_slug LIMIT 1")
            .bind(("brand_slug", brand_slug.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(Tenant::from))
    }

    async fn claim_slug(&self, principal_id: &str, brand_slug: &str) -> MiPropinaResult<()> {
        match self.slug_holder(brand_slug).await? {
            Some(holder) if holder == principal_id => return Ok(()),
            Some(_) => return Err(DbError::SlugTaken(brand_slug.to_string()).into()),
            None => {}
        }

        let response = self
            .db
            .query("CREATE type::record('brand_slug', $slug) SET principal_id = $principal_id")
            .bind(("slug", brand_slug.to_string()))
            .bind(("principal_id", principal_id.to_string()))
            .await
            .map_err(DbError::from)?;

        if let Err(err) = response.check() {
            // Lost a race for the same record id: whoever won holds it now.
            return match self.slug_holder(brand_slug).await? {
                Some(holder) if holder == principal_id => Ok(()),
                Some(_) => Err(DbError::SlugTaken(brand_slug.to_string()).into()),
                None => Err(DbError::Query(err.to_string()).into()),
            };
        }

        info!(principal_id, brand_slug, "brand slug claimed");
        Ok(())
    }

    async fn complete_onboarding(
        &self,
        principal_id: &str,
        input: CompleteOnboarding,
    ) -> MiPropinaResult<Tenant> {
        // The brand is written only while the record is still not
        // onboarded, and claims are released only when the record does not
        // point at them, all inside one transaction.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPSERT type::record('tenant', $principal_id) SET \
                 principal_id = $principal_id; \
                 UPDATE type::record('tenant', $principal_id) SET \
                 first_name = $first_name, last_name = $last_name, \
                 phone = $phone, address = $address, \
                 brand_name = $brand_name, brand_slug = $brand_slug, \
                 admin_path = $admin_path, store_path = $store_path, \
                 onboarding_complete = true, \
                 updated_at = time::now(), last_seen_at = time::now() \
                 WHERE onboarding_complete = false; \
                 DELETE brand_slug WHERE principal_id = $principal_id \
                 AND meta::id(id) != \
                 (SELECT VALUE brand_slug FROM type::record('tenant', $principal_id))[0]; \
                 COMMIT TRANSACTION;",
            )
            .bind(("principal_id", principal_id.to_string()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("phone", input.phone))
            .bind(("address", input.address))
            .bind(("brand_name", input.brand_name))
            .bind(("brand_slug", input.brand_slug))
            .bind(("admin_path", input.admin_path))
            .bind(("store_path", input.store_path))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get(principal_id).await
    }

    async fn update(&self, principal_id: &str, input: UpdateTenant) -> MiPropinaResult<Tenant> {
        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.address.is_some() {
            sets.push("address = $address");
        }
        if input.logo_url.is_some() {
            sets.push("logo_url = $logo_url");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $principal_id) SET {}",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("principal_id", principal_id.to_string()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(address) = input.address {
            builder = builder.bind(("address", address));
        }
        if let Some(logo_url) = input.logo_url {
            builder = builder.bind(("logo_url", logo_url));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(Self::single(rows, principal_id)?)
    }

    async fn delete(&self, principal_id: &str) -> MiPropinaResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE employee WHERE owner_id = $principal_id; \
                 DELETE type::record('rating_config', $principal_id); \
                 DELETE brand_slug WHERE principal_id = $principal_id; \
                 DELETE type::record('tenant', $principal_id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("principal_id", principal_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        info!(principal_id, "tenant deleted");
        Ok(())
    }
}
