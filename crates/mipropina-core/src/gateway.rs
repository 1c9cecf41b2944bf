//! Contracts for the identity provider and the blob store.

use crate::error::MiPropinaResult;
use crate::models::principal::{Metadata, Principal};

/// The external identity provider, as seen by the tenant directory.
///
/// Authentication itself (turning a request credential into a principal
/// id) happens before any directory call; see `mipropina-identity`.
pub trait IdentityGateway: Send + Sync {
    fn get_principal(&self, id: &str) -> impl Future<Output = MiPropinaResult<Principal>> + Send;

    /// Shallow-merge `patch` into the principal's metadata bag.
    fn patch_metadata(
        &self,
        id: &str,
        patch: Metadata,
    ) -> impl Future<Output = MiPropinaResult<()>> + Send;
}

/// Object storage for uploaded images.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path` inside `bucket`, overwriting any object
    /// already there.
    fn put_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = MiPropinaResult<()>> + Send;

    /// Public URL at which `path` is served.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
