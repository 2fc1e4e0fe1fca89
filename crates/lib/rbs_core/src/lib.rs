//! # rbs_core
//!
//! Core authentication and session domain logic for the RBS storefront.

pub mod auth;
pub mod clock;
pub mod db;
pub mod mail;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
