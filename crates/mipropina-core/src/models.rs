//! Domain models for MiPropina.
//!
//! These are the core types shared across all crates.

pub mod employee;
pub mod principal;
pub mod rating;
pub mod tenant;
