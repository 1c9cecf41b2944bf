//! Process-local identity gateway for tests and local development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use mipropina_core::error::{MiPropinaError, MiPropinaResult};
use mipropina_core::gateway::IdentityGateway;
use mipropina_core::models::principal::{Metadata, Principal};

#[derive(Debug, Default)]
struct State {
    principals: HashMap<String, Principal>,
    /// When set, `patch_metadata` fails with this message.
    patch_failure: Option<String>,
}

/// [`IdentityGateway`] that keeps principals in memory.
///
/// Unknown principals are created on first read, mirroring a provider
/// that already knows every authenticated user.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityGateway {
    state: Arc<RwLock<State>>,
}

impl InMemoryIdentityGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a principal.
    pub fn insert(&self, principal: Principal) {
        if let Ok(mut state) = self.state.write() {
            state.principals.insert(principal.id.clone(), principal);
        }
    }

    /// Snapshot of a principal, if known.
    pub fn principal(&self, id: &str) -> Option<Principal> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.principals.get(id).cloned())
    }

    /// Make subsequent metadata patches fail, or succeed again with `None`.
    pub fn fail_patches(&self, message: Option<&str>) {
        if let Ok(mut state) = self.state.write() {
            state.patch_failure = message.map(str::to_string);
        }
    }

    fn poisoned() -> MiPropinaError {
        MiPropinaError::Internal("identity state lock poisoned".into())
    }
}

impl IdentityGateway for InMemoryIdentityGateway {
    async fn get_principal(&self, id: &str) -> MiPropinaResult<Principal> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        let principal = state
            .principals
            .entry(id.to_string())
            .or_insert_with(|| Principal {
                id: id.to_string(),
                email: None,
                metadata: Metadata::new(),
            });
        Ok(principal.clone())
    }

    async fn patch_metadata(&self, id: &str, patch: Metadata) -> MiPropinaResult<()> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        if let Some(message) = &state.patch_failure {
            return Err(MiPropinaError::Upstream {
                service: "identity".into(),
                message: message.clone(),
            });
        }
        let principal = state
            .principals
            .get_mut(id)
            .ok_or_else(|| MiPropinaError::not_found("principal", id))?;
        principal.metadata.extend(patch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mipropina_core::models::principal::keys;

    #[tokio::test]
    async fn patch_is_a_shallow_merge() {
        let gateway = InMemoryIdentityGateway::new();
        let mut metadata = Metadata::new();
        metadata.insert(keys::PHONE.into(), "1155550000".into());
        gateway.insert(Principal {
            id: "user_a".into(),
            email: None,
            metadata,
        });

        let mut patch = Metadata::new();
        patch.insert(keys::ONBOARDING_COMPLETE.into(), true.into());
        gateway.patch_metadata("user_a", patch).await.unwrap();

        let principal = gateway.get_principal("user_a").await.unwrap();
        assert!(principal.onboarding_complete());
        assert_eq!(principal.metadata_str(keys::PHONE), Some("1155550000"));
    }

    #[tokio::test]
    async fn unknown_principal_is_created_on_read() {
        let gateway = InMemoryIdentityGateway::new();
        let principal = gateway.get_principal("user_new").await.unwrap();
        assert!(principal.metadata.is_empty());
        assert!(gateway.principal("user_new").is_some());
    }

    #[tokio::test]
    async fn injected_patch_failure_is_upstream() {
        let gateway = InMemoryIdentityGateway::new();
        gateway.get_principal("user_a").await.unwrap();
        gateway.fail_patches(Some("provider down"));

        let err = gateway
            .patch_metadata("user_a", Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MiPropinaError::Upstream { .. }));
    }
}
