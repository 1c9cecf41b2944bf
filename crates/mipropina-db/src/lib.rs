//! MiPropina Database: SurrealDB record store and blob storage.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `mipropina-core` record store
//!   traits ([`repository`])
//! - A filesystem-backed [`FsBlobStore`]
//! - Error types ([`DbError`])

mod blob;
mod connection;
mod error;
pub mod repository;
mod schema;

pub use blob::{FsBlobStore, StorageConfig};
pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
