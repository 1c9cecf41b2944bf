//! Tenant domain model.
//!
//! A tenant is one restaurant (brand). It is keyed by the id of the
//! principal that owns it, and exposed publicly under its brand slug.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::principal::PrincipalId;

/// A restaurant account.
///
/// The record exists from the owner's first authenticated request (a
/// "shell" with only the email), and is filled in by onboarding. Once
/// `brand_slug` is set it never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Owning principal. Doubles as the record key.
    pub principal_id: PrincipalId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Display name, e.g. `Café Luz`.
    pub brand_name: Option<String>,
    /// URL-safe unique key, e.g. `cafe-luz`.
    pub brand_slug: Option<String>,
    /// Owner dashboard route (`/admin/{slug}`).
    pub admin_path: Option<String>,
    /// Public store route (`/{slug}`).
    pub store_path: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Tenant {
    /// Public projection of this tenant, or `None` while onboarding is
    /// incomplete.
    pub fn public_profile(&self) -> Option<PublicProfile> {
        if !self.onboarding_complete {
            return None;
        }
        Some(PublicProfile {
            brand_name: self.brand_name.clone()?,
            phone: self.phone.clone(),
            address: self.address.clone(),
            logo_url: self.logo_url.clone(),
        })
    }

    /// `first_name last_name`, trimmed, or `None` if both are empty.
    pub fn full_name(&self) -> Option<String> {
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Fields written when onboarding completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteOnboarding {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub brand_name: String,
    pub brand_slug: String,
    pub admin_path: String,
    pub store_path: String,
}

/// Fields that can be updated on an onboarded tenant. The brand name and
/// slug are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
}

/// Subset of tenant fields visible without authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub brand_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
}
