//! MiPropina Core: domain models, validators and the contracts for the
//! external collaborators (identity provider, record store, blob store).
//!
//! Everything in this crate is free of I/O. Services in
//! `mipropina-tenancy` are generic over the traits defined here so that
//! they can be exercised against in-memory implementations.

pub mod error;
pub mod gateway;
pub mod models;
pub mod repository;
pub mod slug;
pub mod validation;

pub use error::{MiPropinaError, MiPropinaResult};
