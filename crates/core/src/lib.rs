//! TrendMart Core - Shared domain types.
//!
//! This crate provides the common types used by the TrendMart back office:
//! - `server` - JSON API serving the admin dashboard and customer storefront
//! - `integration-tests` - End-to-end tests against a running server
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. Enabling the `postgres` feature adds sqlx `Type`/`Encode`/`Decode`
//! implementations so the types can be bound and decoded directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
