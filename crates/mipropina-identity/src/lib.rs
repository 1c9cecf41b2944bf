//! MiPropina Identity: the boundary to the external identity provider.
//!
//! - [`SessionVerifier`] turns a bearer session token into a principal id
//! - [`WebhookVerifier`] authenticates lifecycle push notifications
//! - [`ClerkIdentityGateway`] reads principals and patches their metadata
//!   over the provider's backend API
//! - [`InMemoryIdentityGateway`] does the same against process memory

pub mod backend;
pub mod clerk;
pub mod config;
pub mod error;
pub mod memory;
pub mod token;
pub mod webhook;

pub use backend::IdentityBackend;
pub use clerk::ClerkIdentityGateway;
pub use config::{IdentityConfig, SessionAlgorithm};
pub use error::IdentityError;
pub use memory::InMemoryIdentityGateway;
pub use token::{SessionClaims, SessionVerifier};
pub use webhook::{IdentityEvent, WebhookHeaders, WebhookVerifier};
