//! Catalog service: product creation and variant reconciliation.
//!
//! Updating a product's variants is expressed as reconciliation: the caller
//! sends the full desired variant set and the service converges the
//! persisted rows to match. Variants omitted from the desired set are
//! archived, never deleted, so order history keeps resolving them.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use thiserror::Error;

use trendmart_core::{CategoryId, ColorId, ImageId, Price, ProductId, SizeId, VariantId};

use crate::db::catalog::{
    self, CatalogRepository, ImageFields, VariantFields,
};
use crate::db::RepositoryError;
use crate::models::catalog::{ProductImage, ProductTree, ProductVariant};

/// Which image row a desired image targets.
///
/// An explicit two-branch choice; there is no sentinel id meaning "create".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageWrite {
    /// Update the image with this id in place.
    Existing(ImageId),
    /// Create a fresh image row.
    New,
}

/// A desired image for one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredImage {
    pub target: ImageWrite,
    pub image_url: String,
    pub alt_text: Option<String>,
    pub is_primary: bool,
}

/// A desired variant, keyed by its `(size, color)` pair.
#[derive(Debug, Clone)]
pub struct DesiredVariant {
    pub size_id: SizeId,
    pub color_id: ColorId,
    /// Left blank to have a sku generated from the variant key.
    pub sku: Option<String>,
    pub price: Price,
    pub stock: i32,
    pub discount_percentage: Option<f64>,
    pub images: Vec<DesiredImage>,
}

/// One write the reconciler decided on for a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantAction {
    /// The key already exists: update fields in place, un-archiving.
    Update {
        variant_id: VariantId,
        fields: VariantFields,
        images: Vec<DesiredImage>,
    },
    /// The key is new: insert a row.
    Create {
        size_id: SizeId,
        color_id: ColorId,
        fields: VariantFields,
        images: Vec<DesiredImage>,
    },
}

/// The reconciler's full write set for one product update.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    /// Persisted variants whose key vanished from the desired set.
    pub archive: Vec<VariantId>,
    pub actions: Vec<VariantAction>,
}

/// One write the reconciler decided on for an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAction {
    Update {
        image_id: ImageId,
        fields: ImageFields,
    },
    Create {
        fields: ImageFields,
    },
}

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The desired set names the same `(size, color)` key twice.
    #[error("duplicate variant key (size {size_id}, color {color_id})")]
    DuplicateVariantKey { size_id: SizeId, color_id: ColorId },

    /// A uniqueness violation the reconciler should have made impossible.
    #[error("variant key collision: {0}")]
    KeyCollision(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog service.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a product with its initial variants and images, atomically.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateVariantKey` for a repeated
    /// `(size, color)` pair, `CatalogError::Repository` on persistence
    /// failures (including unknown category, size, or color ids).
    pub async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
        category_ids: &[CategoryId],
        variants: Vec<DesiredVariant>,
    ) -> Result<ProductTree, CatalogError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let product = catalog::insert_product(&mut tx, name, description).await?;
        catalog::link_categories(&mut tx, product.id, category_ids).await?;

        let plan = plan_variant_reconciliation(product.id, &[], &variants)?;
        apply_plan(&mut tx, product.id, plan).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        let tree = CatalogRepository::new(self.pool)
            .product_tree(product.id, false)
            .await?;
        Ok(tree)
    }

    /// Converge a product's persisted variants to the desired set.
    ///
    /// Runs in one transaction: archives, updates, inserts, and image
    /// writes either all land or none do.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` for an unknown product and
    /// `CatalogError::KeyCollision` if an insert trips the unique
    /// `(product, size, color)` constraint, which indicates a bug rather
    /// than bad input.
    pub async fn update_variants(
        &self,
        product_id: ProductId,
        desired: Vec<DesiredVariant>,
    ) -> Result<ProductTree, CatalogError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        if !catalog::product_exists(&mut tx, product_id).await? {
            return Err(CatalogError::ProductNotFound);
        }

        let current = catalog::variants_for_product(&mut tx, product_id).await?;
        let plan = plan_variant_reconciliation(product_id, &current, &desired)?;
        apply_plan(&mut tx, product_id, plan).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        let tree = CatalogRepository::new(self.pool)
            .product_tree(product_id, false)
            .await?;
        Ok(tree)
    }
}

/// Execute a reconcile plan inside the caller's transaction.
async fn apply_plan(
    tx: &mut sqlx::PgConnection,
    product_id: ProductId,
    plan: ReconcilePlan,
) -> Result<(), CatalogError> {
    catalog::archive_variants(tx, &plan.archive).await?;

    for action in plan.actions {
        let (variant_id, images) = match action {
            VariantAction::Update {
                variant_id,
                fields,
                images,
            } => {
                catalog::update_variant(tx, variant_id, &fields).await?;
                (variant_id, images)
            }
            VariantAction::Create {
                size_id,
                color_id,
                fields,
                images,
            } => {
                let variant_id =
                    catalog::insert_variant(tx, product_id, size_id, color_id, &fields)
                        .await
                        .map_err(|e| match e {
                            RepositoryError::Conflict(msg) => CatalogError::KeyCollision(msg),
                            other => CatalogError::Repository(other),
                        })?;
                (variant_id, images)
            }
        };

        let current_images = catalog::images_for_variant(tx, variant_id).await?;
        let (delete, actions) = plan_image_reconciliation(&current_images, &images);

        catalog::delete_images(tx, &delete).await?;
        for action in actions {
            match action {
                ImageAction::Update { image_id, fields } => {
                    catalog::update_image(tx, image_id, &fields).await?;
                }
                ImageAction::Create { fields } => {
                    catalog::insert_image(tx, variant_id, &fields).await?;
                }
            }
        }
    }

    Ok(())
}

/// Decide the variant writes that converge `current` to `desired`.
///
/// Pure with respect to the database; the service calls it with rows read
/// inside its transaction.
///
/// # Errors
///
/// Returns `CatalogError::DuplicateVariantKey` if the desired set repeats
/// a `(size, color)` key.
pub fn plan_variant_reconciliation(
    product_id: ProductId,
    current: &[ProductVariant],
    desired: &[DesiredVariant],
) -> Result<ReconcilePlan, CatalogError> {
    let mut desired_keys = HashSet::with_capacity(desired.len());
    for variant in desired {
        if !desired_keys.insert((variant.size_id, variant.color_id)) {
            return Err(CatalogError::DuplicateVariantKey {
                size_id: variant.size_id,
                color_id: variant.color_id,
            });
        }
    }

    let by_key: HashMap<(SizeId, ColorId), &ProductVariant> = current
        .iter()
        .map(|v| ((v.size_id, v.color_id), v))
        .collect();

    // Archive whatever the desired set no longer mentions. Already-archived
    // rows are skipped so re-applying the same set stays a no-op.
    let archive = current
        .iter()
        .filter(|v| !v.is_archived && !desired_keys.contains(&(v.size_id, v.color_id)))
        .map(|v| v.id)
        .collect();

    let actions = desired
        .iter()
        .map(|variant| {
            let fields = VariantFields {
                sku: variant
                    .sku
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| generate_sku(product_id, variant.size_id, variant.color_id)),
                price: variant.price,
                stock: variant.stock,
                discount_percentage: variant.discount_percentage,
            };

            match by_key.get(&(variant.size_id, variant.color_id)) {
                Some(existing) => VariantAction::Update {
                    variant_id: existing.id,
                    fields,
                    images: variant.images.clone(),
                },
                None => VariantAction::Create {
                    size_id: variant.size_id,
                    color_id: variant.color_id,
                    fields,
                    images: variant.images.clone(),
                },
            }
        })
        .collect();

    Ok(ReconcilePlan { archive, actions })
}

/// Decide the image writes that converge `current` to `desired` for one
/// variant.
///
/// Images carry no historical references, so rows absent from the desired
/// set are hard-deleted. A stale `Existing` id falls back to a create.
#[must_use]
pub fn plan_image_reconciliation(
    current: &[ProductImage],
    desired: &[DesiredImage],
) -> (Vec<ImageId>, Vec<ImageAction>) {
    let current_ids: HashSet<ImageId> = current.iter().map(|i| i.id).collect();

    let kept: HashSet<ImageId> = desired
        .iter()
        .filter_map(|image| match image.target {
            ImageWrite::Existing(id) if current_ids.contains(&id) => Some(id),
            _ => None,
        })
        .collect();

    let delete = current
        .iter()
        .filter(|i| !kept.contains(&i.id))
        .map(|i| i.id)
        .collect();

    let actions = desired
        .iter()
        .map(|image| {
            let fields = ImageFields {
                image_url: image.image_url.clone(),
                alt_text: image.alt_text.clone(),
                is_primary: image.is_primary,
            };
            match image.target {
                ImageWrite::Existing(id) if current_ids.contains(&id) => {
                    ImageAction::Update {
                        image_id: id,
                        fields,
                    }
                }
                _ => ImageAction::Create { fields },
            }
        })
        .collect();

    (delete, actions)
}

/// Generate a sku from the variant key. Unique because the key is.
fn generate_sku(product_id: ProductId, size_id: SizeId, color_id: ColorId) -> String {
    format!(
        "TM-{}-{}-{}",
        product_id.as_i32(),
        size_id.as_i32(),
        color_id.as_i32()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: i32 = 1;
    const L: i32 = 2;
    const BLACK: i32 = 10;
    const WHITE: i32 = 11;

    fn persisted(id: i32, size: i32, color: i32, archived: bool) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            product_id: ProductId::new(1),
            size_id: SizeId::new(size),
            color_id: ColorId::new(color),
            sku: format!("SKU-{id}"),
            price: Price::from_cents(4999),
            stock: 5,
            discount_percentage: None,
            is_archived: archived,
        }
    }

    fn desired(size: i32, color: i32) -> DesiredVariant {
        DesiredVariant {
            size_id: SizeId::new(size),
            color_id: ColorId::new(color),
            sku: None,
            price: Price::from_cents(5499),
            stock: 3,
            discount_percentage: None,
            images: Vec::new(),
        }
    }

    fn image(id: i32, url: &str) -> ProductImage {
        ProductImage {
            id: ImageId::new(id),
            product_variant_id: VariantId::new(1),
            image_url: url.to_owned(),
            alt_text: None,
            is_primary: false,
        }
    }

    #[test]
    fn omitted_keys_archive_and_new_keys_create() {
        // [(M,Black),(L,Black)] -> [(L,Black),(L,White)]
        let current = vec![persisted(1, M, BLACK, false), persisted(2, L, BLACK, false)];
        let plan = plan_variant_reconciliation(
            ProductId::new(1),
            &current,
            &[desired(L, BLACK), desired(L, WHITE)],
        )
        .expect("plan");

        assert_eq!(plan.archive, vec![VariantId::new(1)]);
        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(
            &plan.actions[0],
            VariantAction::Update { variant_id, .. } if *variant_id == VariantId::new(2)
        ));
        assert!(matches!(
            &plan.actions[1],
            VariantAction::Create { size_id, color_id, .. }
                if *size_id == SizeId::new(L) && *color_id == ColorId::new(WHITE)
        ));
    }

    #[test]
    fn reapplying_the_same_set_is_idempotent() {
        let current = vec![persisted(1, M, BLACK, false)];
        let plan =
            plan_variant_reconciliation(ProductId::new(1), &current, &[desired(M, BLACK)])
                .expect("plan");

        assert!(plan.archive.is_empty());
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(plan.actions[0], VariantAction::Update { .. }));
    }

    #[test]
    fn re_added_archived_key_updates_in_place() {
        let current = vec![persisted(1, M, BLACK, true)];
        let plan =
            plan_variant_reconciliation(ProductId::new(1), &current, &[desired(M, BLACK)])
                .expect("plan");

        // The old row is reused and un-archived, not duplicated.
        assert!(plan.archive.is_empty());
        assert!(matches!(
            &plan.actions[0],
            VariantAction::Update { variant_id, .. } if *variant_id == VariantId::new(1)
        ));
    }

    #[test]
    fn archived_rows_are_not_double_archived() {
        let current = vec![persisted(1, M, BLACK, true), persisted(2, L, BLACK, false)];
        let plan = plan_variant_reconciliation(ProductId::new(1), &current, &[])
            .expect("plan");

        assert_eq!(plan.archive, vec![VariantId::new(2)]);
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn duplicate_desired_keys_are_rejected() {
        let err = plan_variant_reconciliation(
            ProductId::new(1),
            &[],
            &[desired(M, BLACK), desired(M, BLACK)],
        )
        .unwrap_err();

        assert!(matches!(err, CatalogError::DuplicateVariantKey { .. }));
    }

    #[test]
    fn blank_sku_gets_generated_from_the_key() {
        let plan = plan_variant_reconciliation(ProductId::new(7), &[], &[desired(M, BLACK)])
            .expect("plan");

        let VariantAction::Create { fields, .. } = &plan.actions[0] else {
            panic!("expected create");
        };
        assert_eq!(fields.sku, "TM-7-1-10");
    }

    #[test]
    fn explicit_sku_is_kept() {
        let mut variant = desired(M, BLACK);
        variant.sku = Some("CUSTOM-1".to_owned());
        let plan = plan_variant_reconciliation(ProductId::new(7), &[], &[variant])
            .expect("plan");

        let VariantAction::Create { fields, .. } = &plan.actions[0] else {
            panic!("expected create");
        };
        assert_eq!(fields.sku, "CUSTOM-1");
    }

    #[test]
    fn image_plan_deletes_updates_and_creates() {
        let current = vec![image(1, "a.jpg"), image(2, "b.jpg")];
        let desired = vec![
            DesiredImage {
                target: ImageWrite::Existing(ImageId::new(2)),
                image_url: "b-updated.jpg".to_owned(),
                alt_text: Some("front".to_owned()),
                is_primary: true,
            },
            DesiredImage {
                target: ImageWrite::New,
                image_url: "c.jpg".to_owned(),
                alt_text: None,
                is_primary: false,
            },
        ];

        let (delete, actions) = plan_image_reconciliation(&current, &desired);

        assert_eq!(delete, vec![ImageId::new(1)]);
        assert_eq!(actions.len(), 2);
        assert!(matches!(
            &actions[0],
            ImageAction::Update { image_id, fields } if *image_id == ImageId::new(2)
                && fields.image_url == "b-updated.jpg"
        ));
        assert!(matches!(
            &actions[1],
            ImageAction::Create { fields } if fields.image_url == "c.jpg"
        ));
    }

    #[test]
    fn stale_existing_image_id_falls_back_to_create() {
        let desired = vec![DesiredImage {
            target: ImageWrite::Existing(ImageId::new(99)),
            image_url: "x.jpg".to_owned(),
            alt_text: None,
            is_primary: false,
        }];

        let (delete, actions) = plan_image_reconciliation(&[], &desired);

        assert!(delete.is_empty());
        assert!(matches!(actions[0], ImageAction::Create { .. }));
    }
}
