//! Catalog repository: products, variants, images, and lookup tables.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use trendmart_core::{CategoryId, ColorId, ImageId, Price, ProductId, SizeId, VariantId};

use super::RepositoryError;
use crate::models::catalog::{
    Category, Color, Product, ProductImage, ProductTree, ProductVariant, Size, VariantTree,
};

/// Variant fields written by the reconciler (everything but the key).
#[derive(Debug, Clone, PartialEq)]
pub struct VariantFields {
    pub sku: String,
    pub price: Price,
    pub stock: i32,
    pub discount_percentage: Option<f64>,
}

/// Image fields written by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFields {
    pub image_url: String,
    pub alt_text: Option<String>,
    pub is_primary: bool,
}

/// Row shape for variants joined with their size and color lookups.
#[derive(sqlx::FromRow)]
struct VariantRow {
    #[sqlx(flatten)]
    variant: ProductVariant,
    size_value: String,
    color_name: String,
    color_hex: Option<String>,
}

impl VariantRow {
    fn into_tree(self, images: Vec<ProductImage>) -> VariantTree {
        let size = Size {
            id: self.variant.size_id,
            value: self.size_value,
        };
        let color = Color {
            id: self.variant.color_id,
            name: self.color_name,
            hex_code: self.color_hex,
        };
        VariantTree {
            variant: self.variant,
            size,
            color,
            images,
        }
    }
}

const VARIANT_TREE_SELECT: &str = r"
    SELECT v.id, v.product_id, v.size_id, v.color_id, v.sku, v.price, v.stock,
           v.discount_percentage, v.is_archived,
           s.value AS size_value, c.name AS color_name, c.hex_code AS color_hex
    FROM product_variants v
    JOIN sizes s ON s.id = v.size_id
    JOIN colors c ON c.id = v.color_id
";

/// Repository for catalog reads and lookup-table writes.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all products with their variants and images.
    ///
    /// `include_archived` is true for the admin dashboard; the storefront
    /// only ever sees live variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_products(
        &self,
        include_archived: bool,
    ) -> Result<Vec<ProductTree>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, description, created_at, updated_at
            FROM products
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, VariantRow>(&format!(
            "{VARIANT_TREE_SELECT} WHERE ($1 OR NOT v.is_archived) ORDER BY v.id"
        ))
        .bind(include_archived)
        .fetch_all(self.pool)
        .await?;

        let variant_ids: Vec<i32> = rows.iter().map(|r| r.variant.id.as_i32()).collect();
        let mut images = images_by_variant(self.pool, &variant_ids).await?;

        let mut by_product: HashMap<ProductId, Vec<VariantTree>> = HashMap::new();
        for row in rows {
            let imgs = images.remove(&row.variant.id).unwrap_or_default();
            by_product
                .entry(row.variant.product_id)
                .or_default()
                .push(row.into_tree(imgs));
        }

        Ok(products
            .into_iter()
            .map(|product| {
                let variants = by_product.remove(&product.id).unwrap_or_default();
                ProductTree { product, variants }
            })
            .collect())
    }

    /// Load one product with its variants and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn product_tree(
        &self,
        product_id: ProductId,
        include_archived: bool,
    ) -> Result<ProductTree, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, description, created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let rows = sqlx::query_as::<_, VariantRow>(&format!(
            "{VARIANT_TREE_SELECT} WHERE v.product_id = $1 AND ($2 OR NOT v.is_archived) ORDER BY v.id"
        ))
        .bind(product_id)
        .bind(include_archived)
        .fetch_all(self.pool)
        .await?;

        let variant_ids: Vec<i32> = rows.iter().map(|r| r.variant.id.as_i32()).collect();
        let mut images = images_by_variant(self.pool, &variant_ids).await?;

        let variants = rows
            .into_iter()
            .map(|row| {
                let imgs = images.remove(&row.variant.id).unwrap_or_default();
                row.into_tree(imgs)
            })
            .collect();

        Ok(ProductTree { product, variants })
    }

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, is_deletable FROM categories ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// List all sizes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sizes(&self) -> Result<Vec<Size>, RepositoryError> {
        let sizes = sqlx::query_as::<_, Size>("SELECT id, value FROM sizes ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        Ok(sizes)
    }

    /// List all colors.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_colors(&self) -> Result<Vec<Color>, RepositoryError> {
        let colors = sqlx::query_as::<_, Color>(
            "SELECT id, name, hex_code FROM colors ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(colors)
    }

    /// Create a category, optionally under a parent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name already exists.
    pub async fn create_category(
        &self,
        name: &str,
        parent_id: Option<CategoryId>,
    ) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            INSERT INTO categories (name, parent_id)
            VALUES ($1, $2)
            RETURNING id, name, parent_id, is_deletable
            ",
        )
        .bind(name)
        .bind(parent_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "category name already exists"))?;

        Ok(category)
    }

    /// Create a color.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or hex code exists.
    pub async fn create_color(
        &self,
        name: &str,
        hex_code: Option<&str>,
    ) -> Result<Color, RepositoryError> {
        let color = sqlx::query_as::<_, Color>(
            r"
            INSERT INTO colors (name, hex_code)
            VALUES ($1, $2)
            RETURNING id, name, hex_code
            ",
        )
        .bind(name)
        .bind(hex_code)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "color already exists"))?;

        Ok(color)
    }
}

/// Load variant trees by id, archived included.
///
/// Order and cart views resolve their variant references through this, so
/// history keeps rendering after the catalog archives a variant.
pub(crate) async fn variant_trees_by_ids(
    pool: &PgPool,
    variant_ids: &[i32],
) -> Result<HashMap<VariantId, VariantTree>, RepositoryError> {
    if variant_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, VariantRow>(&format!(
        "{VARIANT_TREE_SELECT} WHERE v.id = ANY($1)"
    ))
    .bind(variant_ids)
    .fetch_all(pool)
    .await?;

    let mut images = images_by_variant(pool, variant_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let imgs = images.remove(&row.variant.id).unwrap_or_default();
            (row.variant.id, row.into_tree(imgs))
        })
        .collect())
}

/// Load images for a set of variants, grouped by variant id.
async fn images_by_variant(
    pool: &PgPool,
    variant_ids: &[i32],
) -> Result<HashMap<VariantId, Vec<ProductImage>>, RepositoryError> {
    if variant_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let images = sqlx::query_as::<_, ProductImage>(
        r"
        SELECT id, product_variant_id, image_url, alt_text, is_primary
        FROM product_images
        WHERE product_variant_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(variant_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<VariantId, Vec<ProductImage>> = HashMap::new();
    for image in images {
        grouped.entry(image.product_variant_id).or_default().push(image);
    }
    Ok(grouped)
}

// =============================================================================
// Transaction-scoped writes (caller owns the transaction)
// =============================================================================

/// Check that a product exists, inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn product_exists(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<bool, RepositoryError> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

/// Insert a product shell.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_product(
    conn: &mut PgConnection,
    name: &str,
    description: Option<&str>,
) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        INSERT INTO products (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description, created_at, updated_at
        ",
    )
    .bind(name)
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(product)
}

/// Connect a product to its categories.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails (including an
/// unknown category id, via the foreign key).
pub async fn link_categories(
    conn: &mut PgConnection,
    product_id: ProductId,
    category_ids: &[CategoryId],
) -> Result<(), RepositoryError> {
    for category_id in category_ids {
        sqlx::query(
            r"
            INSERT INTO product_categories (product_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Load every variant of a product (archived included), inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn variants_for_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Vec<ProductVariant>, RepositoryError> {
    let variants = sqlx::query_as::<_, ProductVariant>(
        r"
        SELECT id, product_id, size_id, color_id, sku, price, stock,
               discount_percentage, is_archived
        FROM product_variants
        WHERE product_id = $1
        ORDER BY id
        ",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(variants)
}

/// Archive variants by id (soft delete; order history keeps referencing them).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn archive_variants(
    conn: &mut PgConnection,
    variant_ids: &[VariantId],
) -> Result<(), RepositoryError> {
    if variant_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();
    sqlx::query("UPDATE product_variants SET is_archived = TRUE WHERE id = ANY($1)")
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Update an existing variant in place, un-archiving it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn update_variant(
    conn: &mut PgConnection,
    variant_id: VariantId,
    fields: &VariantFields,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE product_variants
        SET sku = $2, price = $3, stock = $4, discount_percentage = $5, is_archived = FALSE
        WHERE id = $1
        ",
    )
    .bind(variant_id)
    .bind(&fields.sku)
    .bind(fields.price)
    .bind(fields.stock)
    .bind(fields.discount_percentage)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert a new variant for a (size, color) key.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a `(product, size, color)` key
/// collision - which the reconciler treats as an internal bug.
pub async fn insert_variant(
    conn: &mut PgConnection,
    product_id: ProductId,
    size_id: SizeId,
    color_id: ColorId,
    fields: &VariantFields,
) -> Result<VariantId, RepositoryError> {
    let (id,): (VariantId,) = sqlx::query_as(
        r"
        INSERT INTO product_variants (product_id, size_id, color_id, sku, price, stock,
                                      discount_percentage)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        ",
    )
    .bind(product_id)
    .bind(size_id)
    .bind(color_id)
    .bind(&fields.sku)
    .bind(fields.price)
    .bind(fields.stock)
    .bind(fields.discount_percentage)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_sqlx(e, "variant key collision"))?;

    Ok(id)
}

/// Load a variant's images, inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn images_for_variant(
    conn: &mut PgConnection,
    variant_id: VariantId,
) -> Result<Vec<ProductImage>, RepositoryError> {
    let images = sqlx::query_as::<_, ProductImage>(
        r"
        SELECT id, product_variant_id, image_url, alt_text, is_primary
        FROM product_images
        WHERE product_variant_id = $1
        ORDER BY id
        ",
    )
    .bind(variant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(images)
}

/// Hard-delete images (no historical references to preserve).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_images(
    conn: &mut PgConnection,
    image_ids: &[ImageId],
) -> Result<(), RepositoryError> {
    if image_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = image_ids.iter().map(ImageId::as_i32).collect();
    sqlx::query("DELETE FROM product_images WHERE id = ANY($1)")
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Update an existing image in place.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn update_image(
    conn: &mut PgConnection,
    image_id: ImageId,
    fields: &ImageFields,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE product_images
        SET image_url = $2, alt_text = $3, is_primary = $4
        WHERE id = $1
        ",
    )
    .bind(image_id)
    .bind(&fields.image_url)
    .bind(&fields.alt_text)
    .bind(fields.is_primary)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert a new image for a variant.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_image(
    conn: &mut PgConnection,
    variant_id: VariantId,
    fields: &ImageFields,
) -> Result<ImageId, RepositoryError> {
    let (id,): (ImageId,) = sqlx::query_as(
        r"
        INSERT INTO product_images (product_variant_id, image_url, alt_text, is_primary)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(variant_id)
    .bind(&fields.image_url)
    .bind(&fields.alt_text)
    .bind(fields.is_primary)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}
