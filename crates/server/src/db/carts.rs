//! Cart repository.

use sqlx::{PgConnection, PgPool};

use trendmart_core::{CartItemId, UserId, VariantId};

use super::RepositoryError;
use crate::models::CartItem;

/// Repository for per-user cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's cart lines, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(
            r"
            SELECT id, user_id, product_variant_id, quantity, created_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY created_at
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Add a variant to a user's cart, folding into the existing line if the
    /// variant is already there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails (including an
    /// unknown variant id, via the foreign key).
    pub async fn upsert_item(
        &self,
        user_id: UserId,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO cart_items (user_id, product_variant_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_variant_id) DO UPDATE
            SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_variant_id, quantity, created_at
            ",
        )
        .bind(user_id)
        .bind(variant_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;

        Ok(item)
    }

    /// Set the quantity of an existing cart line, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist or
    /// belongs to someone else.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            UPDATE cart_items
            SET quantity = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_variant_id, quantity, created_at
            ",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(item)
    }

    /// Remove one cart line, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist or
    /// belongs to someone else.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Remove the purchased variants from a user's cart, inside the checkout
/// transaction. Lines for other variants are left alone.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear_purchased(
    conn: &mut PgConnection,
    user_id: UserId,
    variant_ids: &[VariantId],
) -> Result<(), RepositoryError> {
    if variant_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_variant_id = ANY($2)")
        .bind(user_id)
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
