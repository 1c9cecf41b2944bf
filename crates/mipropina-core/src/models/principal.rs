//! Principal domain model.
//!
//! A principal is an identity owned by the external identity provider.
//! MiPropina never creates principals; it reads them and patches their
//! public metadata bag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity-provider user id (e.g. `user_2abc...`).
pub type PrincipalId = String;

/// A single metadata value. The identity provider stores arbitrary JSON,
/// but this system only ever writes strings and booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Text(String),
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Flat key/value bag attached to a principal.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Metadata keys written by the tenant directory.
pub mod keys {
    pub const ONBOARDING_COMPLETE: &str = "onboardingComplete";
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const FULL_NAME: &str = "fullName";
    pub const PHONE: &str = "phone";
    pub const ADDRESS: &str = "address";
    pub const BRAND_NAME: &str = "brandName";
    pub const BRAND_SLUG: &str = "brandSlug";
    pub const ADMIN_PATH: &str = "adminPath";
    pub const STORE_PATH: &str = "storePath";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    /// Primary email address, if the provider has one on file.
    pub email: Option<String>,
    pub metadata: Metadata,
}

impl Principal {
    /// Non-empty string value for `key`, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        match self.metadata.get(key) {
            Some(MetadataValue::Text(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// `true` only when `key` holds the boolean `true`.
    pub fn metadata_flag(&self, key: &str) -> bool {
        matches!(self.metadata.get(key), Some(MetadataValue::Flag(true)))
    }

    pub fn onboarding_complete(&self) -> bool {
        self.metadata_flag(keys::ONBOARDING_COMPLETE)
    }
}

/// Split a free-form full name into first name and the remainder.
///
/// Used when the metadata bag only carries `fullName` (older accounts).
pub fn split_full_name(full_name: &str) -> (Option<String>, Option<String>) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().map(str::to_string);
    let rest: Vec<&str> = parts.collect();
    let last = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(metadata: Metadata) -> Principal {
        Principal {
            id: "user_1".into(),
            email: None,
            metadata,
        }
    }

    #[test]
    fn empty_strings_read_as_absent() {
        let mut metadata = Metadata::new();
        metadata.insert(keys::PHONE.into(), "".into());
        metadata.insert(keys::ADDRESS.into(), "Calle 123".into());
        let p = principal(metadata);

        assert_eq!(p.metadata_str(keys::PHONE), None);
        assert_eq!(p.metadata_str(keys::ADDRESS), Some("Calle 123"));
    }

    #[test]
    fn onboarding_flag_requires_boolean_true() {
        let mut metadata = Metadata::new();
        metadata.insert(keys::ONBOARDING_COMPLETE.into(), "true".into());
        assert!(!principal(metadata.clone()).onboarding_complete());

        metadata.insert(keys::ONBOARDING_COMPLETE.into(), true.into());
        assert!(principal(metadata).onboarding_complete());
    }

    #[test]
    fn metadata_round_trips_as_plain_json() {
        let mut metadata = Metadata::new();
        metadata.insert(keys::ONBOARDING_COMPLETE.into(), true.into());
        metadata.insert(keys::BRAND_SLUG.into(), "cafe-luz".into());

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"brandSlug": "cafe-luz", "onboardingComplete": true})
        );
    }

    #[test]
    fn split_full_name_keeps_compound_last_names() {
        assert_eq!(
            split_full_name("  Ana  de la Cruz "),
            (Some("Ana".into()), Some("de la Cruz".into()))
        );
        assert_eq!(split_full_name("Ana"), (Some("Ana".into()), None));
        assert_eq!(split_full_name("   "), (None, None));
    }
}
