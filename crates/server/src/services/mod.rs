//! Business logic services.
//!
//! Services own transactions and compose repository calls; routes stay thin.
//! The two workhorses are [`checkout::CheckoutService`] (atomic order
//! placement from the cart) and [`catalog::CatalogService`] (variant
//! reconciliation on product updates).

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod email;

pub use auth::{AuthError, AuthService};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService};
