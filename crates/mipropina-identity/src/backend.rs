//! Runtime selection between identity gateway implementations.

use mipropina_core::error::MiPropinaResult;
use mipropina_core::gateway::IdentityGateway;
use mipropina_core::models::principal::{Metadata, Principal};
use tracing::{info, warn};

use crate::clerk::ClerkIdentityGateway;
use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::memory::InMemoryIdentityGateway;

/// The gateway chosen from configuration at startup.
#[derive(Clone)]
pub enum IdentityBackend {
    Clerk(ClerkIdentityGateway),
    InMemory(InMemoryIdentityGateway),
}

impl IdentityBackend {
    /// Use the provider API when a secret key is configured, otherwise
    /// fall back to an in-memory gateway.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, IdentityError> {
        match &config.api_secret_key {
            Some(secret) => {
                info!(base_url = %config.api_base_url, "using identity provider API");
                Ok(Self::Clerk(ClerkIdentityGateway::new(config, secret.clone())?))
            }
            None => {
                warn!("no identity provider secret configured, using in-memory gateway");
                Ok(Self::InMemory(InMemoryIdentityGateway::new()))
            }
        }
    }
}

impl IdentityGateway for IdentityBackend {
    async fn get_principal(&self, id: &str) -> MiPropinaResult<Principal> {
        match self {
            Self::Clerk(gateway) => gateway.get_principal(id).await,
            Self::InMemory(gateway) => gateway.get_principal(id).await,
        }
    }

    async fn patch_metadata(&self, id: &str, patch: Metadata) -> MiPropinaResult<()> {
        match self {
            Self::Clerk(gateway) => gateway.patch_metadata(id, patch).await,
            Self::InMemory(gateway) => gateway.patch_metadata(id, patch).await,
        }
    }
}
