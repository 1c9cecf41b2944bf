//! Maps principals to tenants and mediates every owner read and write.
//!
//! Every operation takes the principal id explicitly. The durable record
//! store is the source of truth; the identity provider's metadata bag is
//! written after it and repaired from it on `touch`.

use mipropina_core::error::{MiPropinaError, MiPropinaResult};
use mipropina_core::gateway::{BlobStore, IdentityGateway};
use mipropina_core::models::employee::{CreateEmployee, Employee, PublicWaiter, UpdateEmployee};
use mipropina_core::models::principal::{Metadata, MetadataValue, Principal, keys, split_full_name};
use mipropina_core::models::rating::{
    CreateRatingSubmission, FeatureAverage, RatingConfig, RatingSubmission, feature_averages,
};
use mipropina_core::models::tenant::{CompleteOnboarding, PublicProfile, Tenant, UpdateTenant};
use mipropina_core::repository::{
    EmployeeRepository, PaginatedResult, Pagination, RatingConfigRepository,
    RatingSubmissionRepository, RecordStore, TenantRepository,
};
use mipropina_core::slug::{admin_path, slugify, store_path};
use mipropina_core::validation::{
    EmployeeInput, OnboardingInput, PersonalDataInput, RatingSubmissionData, validate_employee,
    validate_onboarding, validate_personal_data, validate_rating_features,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assets::{AssetUploadMediator, ImageUpload, is_inline_image};

const SLUG_TAKEN: &str = "Ese nombre de marca ya esta en uso. Proba con otro.";
const BRAND_IMMUTABLE: &str = "La marca ya fue registrada y no puede modificarse.";
const NO_TENANT_CONTEXT: &str = "No se pudo resolver el contexto del restaurante.";
const NO_SLUG_FOR_PHOTO: &str = "No se encontro brandSlug para guardar la foto del mozo.";
const NO_SLUG_FOR_LOGO: &str = "Completa el onboarding antes de subir el logo.";
const PHOTO_NOT_OWNED: &str = "La foto debe ser una imagen nueva o la foto actual del mozo.";

/// Editable owner profile, as shown on the admin personal-data screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub brand_name: Option<String>,
    pub brand_slug: Option<String>,
    pub logo_url: Option<String>,
}

impl From<&Tenant> for OwnerProfile {
    fn from(tenant: &Tenant) -> Self {
        Self {
            first_name: tenant.first_name.clone(),
            last_name: tenant.last_name.clone(),
            phone: tenant.phone.clone(),
            address: tenant.address.clone(),
            brand_name: tenant.brand_name.clone(),
            brand_slug: tenant.brand_slug.clone(),
            logo_url: tenant.logo_url.clone(),
        }
    }
}

/// What to do with an employee's photo on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeePhoto {
    /// No photo (clears it on update).
    None,
    /// Keep a URL that is already stored for this employee.
    Existing(String),
    /// Upload a new image.
    Inline(ImageUpload),
}

impl EmployeePhoto {
    /// Interpret the `image` field of an employee form: blank means no
    /// photo, a `data:image/...` URL is a new upload, anything else is a
    /// previously stored URL.
    pub fn from_field(value: Option<&str>) -> MiPropinaResult<Self> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(Self::None),
            Some(v) if is_inline_image(v) => Ok(Self::Inline(ImageUpload::from_data_url(v)?)),
            Some(v) => Ok(Self::Existing(v.to_string())),
        }
    }
}

/// Owner view of the ratings received.
#[derive(Debug, Clone)]
pub struct RatingSummary {
    pub features: Vec<String>,
    pub averages: Vec<FeatureAverage>,
    pub submissions: PaginatedResult<RatingSubmission>,
}

/// The tenant directory.
///
/// Generic over the record store, identity gateway and blob store so
/// that it has no dependency on the database or provider crates.
pub struct TenantDirectory<R: RecordStore, I: IdentityGateway, B: BlobStore> {
    records: R,
    identity: I,
    assets: AssetUploadMediator<B>,
}

impl<R: RecordStore, I: IdentityGateway, B: BlobStore> TenantDirectory<R, I, B> {
    pub fn new(records: R, identity: I, assets: AssetUploadMediator<B>) -> Self {
        Self {
            records,
            identity,
            assets,
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    // -----------------------------------------------------------------------
    // Principal lifecycle
    // -----------------------------------------------------------------------

    /// Ensure a tenant record exists for `principal_id` and refresh its
    /// email and last-seen timestamp. Idempotent.
    pub async fn touch(&self, principal_id: &str, email: Option<&str>) -> MiPropinaResult<Tenant> {
        let tenant = self.records.tenants().touch(principal_id, email).await?;

        match self.identity.get_principal(principal_id).await {
            Ok(principal) => Ok(self.reconcile(tenant, &principal).await),
            Err(e) => {
                warn!(principal_id, error = %e, "principal unavailable, skipping metadata sync");
                Ok(tenant)
            }
        }
    }

    /// `touch` for an authenticated request that only carries the
    /// principal id. The email comes from the identity provider.
    pub async fn touch_principal(&self, principal_id: &str) -> MiPropinaResult<Tenant> {
        match self.identity.get_principal(principal_id).await {
            Ok(principal) => self.sync_principal(&principal).await,
            Err(e) => {
                warn!(principal_id, error = %e, "principal unavailable, touching without email");
                self.records.tenants().touch(principal_id, None).await
            }
        }
    }

    /// `touch` with a principal already in hand (identity webhooks).
    pub async fn sync_principal(&self, principal: &Principal) -> MiPropinaResult<Tenant> {
        let tenant = self
            .records
            .tenants()
            .touch(&principal.id, principal.email.as_deref())
            .await?;
        Ok(self.reconcile(tenant, principal).await)
    }

    /// Delete the principal's tenant, employees, rating configuration and
    /// slug claim.
    pub async fn remove_principal(&self, principal_id: &str) -> MiPropinaResult<()> {
        self.records.tenants().delete(principal_id).await?;
        info!(principal_id, "tenant removed");
        Ok(())
    }

    /// Bring the durable record and the metadata bag back in line.
    ///
    /// Failures are logged and swallowed: the request that triggered the
    /// touch must not fail because the cache could not be repaired.
    async fn reconcile(&self, tenant: Tenant, principal: &Principal) -> Tenant {
        if tenant.onboarding_complete {
            let expected = onboarding_metadata(&tenant);
            let stale = expected
                .iter()
                .any(|(key, value)| principal.metadata.get(key) != Some(value));
            if stale {
                match self.identity.patch_metadata(&principal.id, expected).await {
                    Ok(()) => info!(principal_id = %principal.id, "metadata repaired from record"),
                    Err(e) => warn!(principal_id = %principal.id, error = %e, "metadata repair failed"),
                }
            }
            return tenant;
        }

        if principal.onboarding_complete() {
            return match self.backfill(principal).await {
                Ok(Some(backfilled)) => backfilled,
                Ok(None) => tenant,
                Err(e) => {
                    warn!(principal_id = %principal.id, error = %e, "tenant backfill failed");
                    tenant
                }
            };
        }

        debug!(principal_id = %principal.id, "tenant touched");
        tenant
    }

    /// Accounts onboarded before the durable record existed only carry
    /// their brand in the metadata bag. Claim it and write the record.
    async fn backfill(&self, principal: &Principal) -> MiPropinaResult<Option<Tenant>> {
        let Some(brand_name) = principal.metadata_str(keys::BRAND_NAME) else {
            return Ok(None);
        };
        let brand_slug = principal
            .metadata_str(keys::BRAND_SLUG)
            .map(str::to_string)
            .unwrap_or_else(|| slugify(brand_name));
        if brand_slug.is_empty() {
            return Ok(None);
        }

        let (split_first, split_last) = principal
            .metadata_str(keys::FULL_NAME)
            .map(split_full_name)
            .unwrap_or_default();
        let first_name = principal
            .metadata_str(keys::FIRST_NAME)
            .map(str::to_string)
            .or(split_first)
            .unwrap_or_default();
        let last_name = principal
            .metadata_str(keys::LAST_NAME)
            .map(str::to_string)
            .or(split_last)
            .unwrap_or_default();

        self.records
            .tenants()
            .claim_slug(&principal.id, &brand_slug)
            .await?;
        let tenant = self
            .records
            .tenants()
            .complete_onboarding(
                &principal.id,
                CompleteOnboarding {
                    first_name,
                    last_name,
                    phone: principal.metadata_str(keys::PHONE).unwrap_or_default().into(),
                    address: principal.metadata_str(keys::ADDRESS).unwrap_or_default().into(),
                    brand_name: brand_name.to_string(),
                    admin_path: admin_path(&brand_slug),
                    store_path: store_path(&brand_slug),
                    brand_slug,
                },
            )
            .await?;

        info!(principal_id = %principal.id, brand_slug = ?tenant.brand_slug, "tenant backfilled from metadata");
        Ok(Some(tenant))
    }

    // -----------------------------------------------------------------------
    // Onboarding & profile
    // -----------------------------------------------------------------------

    /// Validate the onboarding form, claim the brand slug, write the
    /// durable record and then the metadata bag.
    ///
    /// Re-submitting the brand a principal already owns returns the
    /// existing tenant untouched. A different brand is a `Conflict`.
    pub async fn complete_onboarding(
        &self,
        principal_id: &str,
        input: &OnboardingInput,
    ) -> MiPropinaResult<Tenant> {
        // 1. Validate; nothing is persisted on failure.
        let data = validate_onboarding(input).into_result()?;

        // 2. The brand key is immutable once set.
        match self.records.tenants().get(principal_id).await {
            Ok(existing) if existing.onboarding_complete => {
                if existing.brand_slug.as_deref() == Some(data.brand_slug.as_str()) {
                    debug!(principal_id, "onboarding resubmitted for the same brand");
                    return Ok(existing);
                }
                return Err(MiPropinaError::Conflict {
                    message: BRAND_IMMUTABLE.into(),
                });
            }
            Ok(_) | Err(MiPropinaError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        // 3. Claim the slug.
        self.records
            .tenants()
            .claim_slug(principal_id, &data.brand_slug)
            .await
            .map_err(|e| match e {
                MiPropinaError::Conflict { .. } => MiPropinaError::Conflict {
                    message: SLUG_TAKEN.into(),
                },
                other => other,
            })?;

        // 4. Durable record first. A concurrent onboarding of the same
        //    principal may have won; its brand stands.
        let personal = data.personal;
        let requested_slug = data.brand_slug.clone();
        let tenant = self
            .records
            .tenants()
            .complete_onboarding(
                principal_id,
                CompleteOnboarding {
                    first_name: personal.first_name,
                    last_name: personal.last_name,
                    phone: personal.phone,
                    address: personal.address,
                    brand_name: data.brand_name,
                    admin_path: admin_path(&data.brand_slug),
                    store_path: store_path(&data.brand_slug),
                    brand_slug: data.brand_slug,
                },
            )
            .await?;
        if tenant.brand_slug.as_deref() != Some(requested_slug.as_str()) {
            warn!(principal_id, brand_slug = %requested_slug, "onboarding lost to a concurrent brand");
            return Err(MiPropinaError::Conflict {
                message: BRAND_IMMUTABLE.into(),
            });
        }

        // 5. Then the metadata bag.
        self.identity
            .patch_metadata(principal_id, onboarding_metadata(&tenant))
            .await?;

        info!(principal_id, brand_slug = ?tenant.brand_slug, "onboarding completed");
        Ok(tenant)
    }

    pub async fn profile(&self, principal_id: &str) -> MiPropinaResult<OwnerProfile> {
        let tenant = self.records.tenants().get(principal_id).await?;
        Ok(OwnerProfile::from(&tenant))
    }

    /// Update name, phone and address. The brand is not editable.
    pub async fn update_profile(
        &self,
        principal_id: &str,
        input: &PersonalDataInput,
    ) -> MiPropinaResult<OwnerProfile> {
        let tenant = self.onboarded_tenant(principal_id).await?;
        let personal = validate_personal_data(input).into_result()?;

        let updated = self
            .records
            .tenants()
            .update(
                &tenant.principal_id,
                UpdateTenant {
                    first_name: Some(personal.first_name.clone()),
                    last_name: Some(personal.last_name.clone()),
                    phone: Some(personal.phone.clone()),
                    address: Some(personal.address.clone()),
                    logo_url: None,
                },
            )
            .await?;

        let mut patch = Metadata::new();
        patch.insert(keys::FULL_NAME.into(), personal.full_name().into());
        patch.insert(keys::FIRST_NAME.into(), personal.first_name.into());
        patch.insert(keys::LAST_NAME.into(), personal.last_name.into());
        patch.insert(keys::PHONE.into(), personal.phone.into());
        patch.insert(keys::ADDRESS.into(), personal.address.into());
        self.identity.patch_metadata(principal_id, patch).await?;

        info!(principal_id, "personal data updated");
        Ok(OwnerProfile::from(&updated))
    }

    async fn onboarded_tenant(&self, principal_id: &str) -> MiPropinaResult<Tenant> {
        let tenant = match self.records.tenants().get(principal_id).await {
            Ok(tenant) => tenant,
            Err(MiPropinaError::NotFound { .. }) => {
                return Err(MiPropinaError::invalid("onboarding", NO_TENANT_CONTEXT));
            }
            Err(e) => return Err(e),
        };
        if !tenant.onboarding_complete || tenant.brand_slug.is_none() {
            return Err(MiPropinaError::invalid("onboarding", NO_TENANT_CONTEXT));
        }
        Ok(tenant)
    }

    // -----------------------------------------------------------------------
    // Logo
    // -----------------------------------------------------------------------

    /// Store a new logo under the tenant's brand and record its URL.
    pub async fn set_logo(&self, principal_id: &str, upload: ImageUpload) -> MiPropinaResult<String> {
        let tenant = self
            .onboarded_tenant(principal_id)
            .await
            .map_err(|e| match e {
                MiPropinaError::Validation { .. } => MiPropinaError::invalid("file", NO_SLUG_FOR_LOGO),
                other => other,
            })?;
        let brand_slug = tenant.brand_slug.unwrap_or_default();

        let url = self.assets.upload_logo(&brand_slug, upload).await?;
        self.records
            .tenants()
            .update(
                principal_id,
                UpdateTenant {
                    logo_url: Some(url.clone()),
                    ..Default::default()
                },
            )
            .await?;

        info!(principal_id, %brand_slug, "logo updated");
        Ok(url)
    }

    pub async fn logo(&self, principal_id: &str) -> MiPropinaResult<Option<String>> {
        match self.records.tenants().get(principal_id).await {
            Ok(tenant) => Ok(tenant.logo_url),
            Err(MiPropinaError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Rating configuration
    // -----------------------------------------------------------------------

    /// Configured features, empty when none have been saved.
    pub async fn rating_config(&self, principal_id: &str) -> MiPropinaResult<Vec<String>> {
        Ok(self
            .records
            .rating_configs()
            .get(principal_id)
            .await?
            .map(|config| config.features)
            .unwrap_or_default())
    }

    /// Replace the feature list. An invalid list leaves the stored one
    /// untouched.
    pub async fn update_rating_config(
        &self,
        principal_id: &str,
        features: &[String],
    ) -> MiPropinaResult<RatingConfig> {
        let features = validate_rating_features(features).into_result()?;
        let config = self
            .records
            .rating_configs()
            .replace(principal_id, features)
            .await?;

        info!(principal_id, count = config.features.len(), "rating features replaced");
        Ok(config)
    }

    /// Submissions newest first, plus the average of every configured
    /// feature across all submissions.
    pub async fn rating_summary(
        &self,
        principal_id: &str,
        pagination: Pagination,
    ) -> MiPropinaResult<RatingSummary> {
        let (config, submissions, scores) = tokio::join!(
            self.records.rating_configs().get(principal_id),
            self.records
                .rating_submissions()
                .list_by_tenant(principal_id, pagination),
            self.records.rating_submissions().scores_by_tenant(principal_id),
        );

        let features = config?.map(|c| c.features).unwrap_or_default();
        let averages = feature_averages(&features, &scores?);
        Ok(RatingSummary {
            features,
            averages,
            submissions: submissions?,
        })
    }

    // -----------------------------------------------------------------------
    // Employee roster
    // -----------------------------------------------------------------------

    pub async fn list_employees(&self, principal_id: &str) -> MiPropinaResult<Vec<Employee>> {
        self.records.employees().list_by_owner(principal_id).await
    }

    pub async fn create_employee(
        &self,
        principal_id: &str,
        input: &EmployeeInput,
        photo: EmployeePhoto,
    ) -> MiPropinaResult<Employee> {
        let fields = validate_employee(input).into_result()?;

        let photo_url = match photo {
            EmployeePhoto::None => None,
            EmployeePhoto::Existing(_) => {
                return Err(MiPropinaError::invalid("image", PHOTO_NOT_OWNED));
            }
            EmployeePhoto::Inline(upload) => Some(self.upload_photo(principal_id, upload).await?),
        };

        let employee = self
            .records
            .employees()
            .create(CreateEmployee {
                owner_id: principal_id.to_string(),
                first_name: fields.first_name,
                last_name: fields.last_name,
                dni: fields.dni,
                phone: fields.phone,
                payment_link: fields.payment_link,
                photo_url,
            })
            .await?;

        info!(principal_id, employee_id = %employee.id, "employee created");
        Ok(employee)
    }

    /// Replace an employee's fields. `NotFound` unless the employee
    /// belongs to `principal_id`.
    pub async fn update_employee(
        &self,
        principal_id: &str,
        employee_id: Uuid,
        input: &EmployeeInput,
        photo: EmployeePhoto,
    ) -> MiPropinaResult<Employee> {
        let fields = validate_employee(input).into_result()?;
        let current = self.records.employees().get(principal_id, employee_id).await?;

        let photo_url = match photo {
            EmployeePhoto::None => None,
            EmployeePhoto::Existing(url) => {
                if current.photo_url.as_deref() != Some(url.as_str()) {
                    return Err(MiPropinaError::invalid("image", PHOTO_NOT_OWNED));
                }
                Some(url)
            }
            EmployeePhoto::Inline(upload) => Some(self.upload_photo(principal_id, upload).await?),
        };

        let employee = self
            .records
            .employees()
            .update(
                principal_id,
                employee_id,
                UpdateEmployee {
                    first_name: fields.first_name,
                    last_name: fields.last_name,
                    dni: fields.dni,
                    phone: fields.phone,
                    payment_link: fields.payment_link,
                    photo_url,
                },
            )
            .await?;

        info!(principal_id, %employee_id, "employee updated");
        Ok(employee)
    }

    /// `NotFound` unless the employee belongs to `principal_id`.
    pub async fn delete_employee(&self, principal_id: &str, employee_id: Uuid) -> MiPropinaResult<()> {
        self.records
            .employees()
            .delete(principal_id, employee_id)
            .await?;
        info!(principal_id, %employee_id, "employee deleted");
        Ok(())
    }

    async fn upload_photo(&self, principal_id: &str, upload: ImageUpload) -> MiPropinaResult<String> {
        let brand_slug = match self.records.tenants().get(principal_id).await {
            Ok(Tenant {
                brand_slug: Some(slug),
                ..
            }) => slug,
            Ok(_) | Err(MiPropinaError::NotFound { .. }) => {
                return Err(MiPropinaError::invalid("image", NO_SLUG_FOR_PHOTO));
            }
            Err(e) => return Err(e),
        };
        self.assets.upload_employee_photo(&brand_slug, upload).await
    }

    // -----------------------------------------------------------------------
    // Lookups by brand slug (no principal)
    // -----------------------------------------------------------------------

    async fn tenant_by_slug(&self, brand_slug: &str) -> MiPropinaResult<Option<Tenant>> {
        if brand_slug.trim().is_empty() {
            return Ok(None);
        }
        self.records.tenants().find_by_slug(brand_slug).await
    }

    /// Public fields of the tenant behind `brand_slug`, or `None`.
    pub async fn find_public_profile(&self, brand_slug: &str) -> MiPropinaResult<Option<PublicProfile>> {
        Ok(self
            .tenant_by_slug(brand_slug)
            .await?
            .and_then(|tenant| tenant.public_profile()))
    }

    /// Public roster of the tenant behind `brand_slug`, empty when the
    /// slug does not resolve.
    pub async fn public_waiters(&self, brand_slug: &str) -> MiPropinaResult<Vec<PublicWaiter>> {
        let Some(tenant) = self.tenant_by_slug(brand_slug).await? else {
            return Ok(Vec::new());
        };
        let employees = self
            .records
            .employees()
            .list_by_owner(&tenant.principal_id)
            .await?;
        Ok(employees.iter().map(Employee::to_public).collect())
    }

    /// Rating features of the tenant behind `brand_slug`, empty when the
    /// slug does not resolve.
    pub async fn rating_features_by_slug(&self, brand_slug: &str) -> MiPropinaResult<Vec<String>> {
        let Some(tenant) = self.tenant_by_slug(brand_slug).await? else {
            return Ok(Vec::new());
        };
        self.rating_config(&tenant.principal_id).await
    }

    /// Append an already validated rating for the tenant behind
    /// `brand_slug`.
    pub async fn record_rating(
        &self,
        brand_slug: &str,
        data: RatingSubmissionData,
    ) -> MiPropinaResult<RatingSubmission> {
        let tenant = self
            .tenant_by_slug(brand_slug)
            .await?
            .ok_or_else(|| MiPropinaError::not_found("brand", brand_slug))?;

        let submission = self
            .records
            .rating_submissions()
            .create(CreateRatingSubmission {
                tenant_id: tenant.principal_id,
                brand_slug: brand_slug.to_string(),
                scores: data.scores,
                comment: data.comment,
            })
            .await?;

        info!(brand_slug, submission_id = %submission.id, "rating recorded");
        Ok(submission)
    }
}

/// The metadata bag an onboarded tenant should carry.
fn onboarding_metadata(tenant: &Tenant) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(keys::ONBOARDING_COMPLETE.into(), MetadataValue::Flag(true));

    let text_fields = [
        (keys::FIRST_NAME, &tenant.first_name),
        (keys::LAST_NAME, &tenant.last_name),
        (keys::PHONE, &tenant.phone),
        (keys::ADDRESS, &tenant.address),
        (keys::BRAND_NAME, &tenant.brand_name),
        (keys::BRAND_SLUG, &tenant.brand_slug),
        (keys::ADMIN_PATH, &tenant.admin_path),
        (keys::STORE_PATH, &tenant.store_path),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            metadata.insert(key.into(), value.into());
        }
    }
    if let Some(full_name) = tenant.full_name() {
        metadata.insert(keys::FULL_NAME.into(), full_name.into());
    }
    metadata
}
