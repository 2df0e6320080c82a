//! Catalog domain types: products, variants, images, and their lookups.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use trendmart_core::{CategoryId, ColorId, ImageId, Price, ProductId, SizeId, VariantId};

/// A product category; categories form a two-level tree via `parent_id`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    /// Seeded main categories cannot be deleted from the dashboard.
    pub is_deletable: bool,
}

/// A size lookup value (e.g. "M", "XL", "42").
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Size {
    pub id: SizeId,
    pub value: String,
}

/// A color lookup value.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Color {
    pub id: ColorId,
    pub name: String,
    pub hex_code: Option<String>,
}

/// A product shell; purchasable state lives on its variants.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable (size, color) combination of a product.
///
/// The `(product_id, size_id, color_id)` triple is unique; the reconciler
/// relies on that key for upserts. Archived variants stay out of customer
/// listings but remain referenceable by historical order items.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub sku: String,
    /// Price in cents.
    pub price: Price,
    pub stock: i32,
    pub discount_percentage: Option<f64>,
    pub is_archived: bool,
}

/// An image attached to a product variant.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_variant_id: VariantId,
    pub image_url: String,
    pub alt_text: Option<String>,
    pub is_primary: bool,
}

/// A product with its variants and their images, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ProductTree {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<VariantTree>,
}

/// A variant with its images and resolved size/color lookups.
#[derive(Debug, Clone, Serialize)]
pub struct VariantTree {
    #[serde(flatten)]
    pub variant: ProductVariant,
    pub size: Size,
    pub color: Color,
    pub images: Vec<ProductImage>,
}
