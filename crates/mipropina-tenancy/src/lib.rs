//! MiPropina Tenancy: the tenant directory, public resolution by brand
//! slug, and image uploads.
//!
//! Everything here is generic over the contracts in `mipropina-core`.

pub mod assets;
pub mod directory;
pub mod public;

pub use assets::{AssetUploadMediator, ImageUpload, safe_file_stem};
pub use directory::{EmployeePhoto, OwnerProfile, RatingSummary, TenantDirectory};
pub use public::{PublicBundle, PublicLookup, PublicResolutionService};
