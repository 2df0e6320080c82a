//! Domain models.
//!
//! These types represent rows and aggregates as the rest of the server sees
//! them - already mapped to the type-safe wrappers from `trendmart-core`.

pub mod catalog;
pub mod order;
pub mod user;

pub use catalog::{
    Category, Color, Product, ProductImage, ProductTree, ProductVariant, Size, VariantTree,
};
pub use order::{
    CartItem, Order, OrderDetail, OrderItem, OrderItemDetail, OrderSummary, Payment, ReturnRequest,
};
pub use user::{Address, User};
