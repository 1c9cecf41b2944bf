//! HTTP client for the identity provider's backend API.

use std::time::Duration;

use mipropina_core::error::MiPropinaResult;
use mipropina_core::gateway::IdentityGateway;
use mipropina_core::models::principal::{Metadata, MetadataValue, Principal};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::error::IdentityError;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEmail {
    pub id: String,
    pub email_address: String,
}

/// User object as returned by the backend API and embedded in webhook
/// payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ProviderEmail>,
    #[serde(default)]
    pub public_metadata: serde_json::Map<String, serde_json::Value>,
}

impl ProviderUser {
    /// The primary email address, falling back to the first one on file.
    pub fn primary_email(&self) -> Option<String> {
        self.primary_email_address_id
            .as_ref()
            .and_then(|primary| self.email_addresses.iter().find(|e| &e.id == primary))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
    }

    pub fn into_principal(self) -> Principal {
        Principal {
            email: self.primary_email(),
            metadata: metadata_from_json(&self.public_metadata),
            id: self.id,
        }
    }
}

/// Keep the string and boolean entries of a provider metadata object.
pub fn metadata_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Metadata {
    map.iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::Bool(b) => MetadataValue::Flag(*b),
                serde_json::Value::String(s) => MetadataValue::Text(s.clone()),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// [`IdentityGateway`] backed by the provider's REST API.
#[derive(Clone)]
pub struct ClerkIdentityGateway {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl ClerkIdentityGateway {
    pub fn new(config: &IdentityConfig, secret_key: String) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            secret_key,
            client,
        })
    }

    fn user_url(&self, id: &str) -> String {
        format!("{}/v1/users/{}", self.base_url, id)
    }

    async fn fetch_user(&self, id: &str) -> Result<ProviderUser, IdentityError> {
        let url = self.user_url(id);
        debug!(principal_id = id, "fetching principal from identity provider");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::PrincipalNotFound(id.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(principal_id = id, status, "identity provider read failed");
            return Err(IdentityError::UpstreamStatus { status, body });
        }

        Ok(response.json::<ProviderUser>().await?)
    }

    async fn send_metadata_patch(&self, id: &str, patch: Metadata) -> Result<(), IdentityError> {
        let url = format!("{}/metadata", self.user_url(id));

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.secret_key)
            .json(&json!({ "public_metadata": patch }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::PrincipalNotFound(id.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(principal_id = id, status, "identity provider metadata patch failed");
            return Err(IdentityError::UpstreamStatus { status, body });
        }

        debug!(principal_id = id, "principal metadata patched");
        Ok(())
    }
}

impl IdentityGateway for ClerkIdentityGateway {
    async fn get_principal(&self, id: &str) -> MiPropinaResult<Principal> {
        Ok(self.fetch_user(id).await?.into_principal())
    }

    async fn patch_metadata(&self, id: &str, patch: Metadata) -> MiPropinaResult<()> {
        Ok(self.send_metadata_patch(id, patch).await?)
    }
}
