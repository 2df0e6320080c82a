//! Order repository and the transaction-scoped steps of order placement.

use sqlx::{PgConnection, PgPool};

use trendmart_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, Price, UserId,
    VariantId,
};

use super::RepositoryError;
use crate::models::catalog::ProductVariant;
use crate::models::{Address, Order, OrderDetail, OrderItem, OrderItemDetail, OrderSummary, Payment};

/// Filters for the paginated order list.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub skip: i64,
    pub take: i64,
    pub status: Option<OrderStatus>,
    /// Set for customer-facing listings; admins see every order.
    pub user_id: Option<UserId>,
}

/// Repository for order reads and status updates.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders (newest first) joined with their customer, plus the total
    /// count matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: OrderFilter,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(
            r"
            SELECT o.id, o.user_id, o.shipping_address_id, o.order_total, o.order_status,
                   o.created_at, o.updated_at,
                   u.full_name AS customer_name, u.email AS customer_email
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE ($3::order_status IS NULL OR o.order_status = $3)
              AND ($4::INTEGER IS NULL OR o.user_id = $4)
            ORDER BY o.created_at DESC
            OFFSET $1 LIMIT $2
            ",
        )
        .bind(filter.skip)
        .bind(filter.take)
        .bind(filter.status)
        .bind(filter.user_id)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM orders o
            WHERE ($1::order_status IS NULL OR o.order_status = $1)
              AND ($2::INTEGER IS NULL OR o.user_id = $2)
            ",
        )
        .bind(filter.status)
        .bind(filter.user_id)
        .fetch_one(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// Load an order with its address, items, resolved variants, and payment.
    ///
    /// When `user_id` is set the lookup is scoped to that owner, so customers
    /// cannot read each other's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no matching order exists, or
    /// `RepositoryError::DataCorruption` if an item references a variant
    /// that no longer resolves.
    pub async fn get_detail(
        &self,
        order_id: OrderId,
        user_id: Option<UserId>,
    ) -> Result<OrderDetail, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, shipping_address_id, order_total, order_status,
                   created_at, updated_at
            FROM orders
            WHERE id = $1 AND ($2::INTEGER IS NULL OR user_id = $2)
            ",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let shipping_address = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, full_name, phone_number, address_line1, city, state,
                   postal_code, is_default, created_at
            FROM addresses
            WHERE id = $1
            ",
        )
        .bind(order.shipping_address_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "order {} references missing address {}",
                order.id, order.shipping_address_id
            ))
        })?;

        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_variant_id, quantity, price_at_purchase
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order.id)
        .fetch_all(self.pool)
        .await?;

        let variant_ids: Vec<i32> = items.iter().map(|i| i.product_variant_id.as_i32()).collect();
        let mut variants = super::catalog::variant_trees_by_ids(self.pool, &variant_ids).await?;

        let items = items
            .into_iter()
            .map(|item| {
                let product_variant = variants.remove(&item.product_variant_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "order item {} references missing variant {}",
                        item.id, item.product_variant_id
                    ))
                })?;
                Ok(OrderItemDetail {
                    item,
                    product_variant,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let payment = sqlx::query_as::<_, Payment>(
            r"
            SELECT id, order_id, amount, payment_method, payment_status,
                   manual_payment_screenshot_url, created_at
            FROM payments
            WHERE order_id = $1
            ",
        )
        .bind(order.id)
        .fetch_optional(self.pool)
        .await?;

        Ok(OrderDetail {
            order,
            shipping_address,
            items,
            payment,
        })
    }

    /// Transition an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            UPDATE orders
            SET order_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, shipping_address_id, order_total, order_status,
                      created_at, updated_at
            ",
        )
        .bind(order_id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(order)
    }
}

// =============================================================================
// Transaction-scoped writes (caller owns the transaction)
// =============================================================================

/// Load variants by id inside a transaction, archived included.
///
/// Checkout re-reads variants inside its own transaction rather than
/// trusting what the cart was priced at earlier.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn variants_by_ids(
    conn: &mut PgConnection,
    variant_ids: &[VariantId],
) -> Result<Vec<ProductVariant>, RepositoryError> {
    if variant_ids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();
    let variants = sqlx::query_as::<_, ProductVariant>(
        r"
        SELECT id, product_id, size_id, color_id, sku, price, stock,
               discount_percentage, is_archived
        FROM product_variants
        WHERE id = ANY($1)
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(variants)
}

/// Atomically decrement a variant's stock, guarded against oversell.
///
/// Returns `false` when the variant lacks sufficient stock; the guard in
/// the WHERE clause means two concurrent checkouts can never both succeed
/// for the last unit.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    variant_id: VariantId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE product_variants
        SET stock = stock - $2
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(variant_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Insert the order row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: UserId,
    shipping_address_id: AddressId,
    order_total: Price,
) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(
        r"
        INSERT INTO orders (user_id, shipping_address_id, order_total)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, shipping_address_id, order_total, order_status,
                  created_at, updated_at
        ",
    )
    .bind(user_id)
    .bind(shipping_address_id)
    .bind(order_total)
    .fetch_one(&mut *conn)
    .await?;

    Ok(order)
}

/// Insert one order line with its captured price.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    variant_id: VariantId,
    quantity: i32,
    price_at_purchase: Price,
) -> Result<OrderItemId, RepositoryError> {
    let (id,): (OrderItemId,) = sqlx::query_as(
        r"
        INSERT INTO order_items (order_id, product_variant_id, quantity, price_at_purchase)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(price_at_purchase)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Insert the payment record attached to an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_payment(
    conn: &mut PgConnection,
    order_id: OrderId,
    amount: Price,
    method: PaymentMethod,
    status: PaymentStatus,
    screenshot_url: Option<&str>,
) -> Result<Payment, RepositoryError> {
    let payment = sqlx::query_as::<_, Payment>(
        r"
        INSERT INTO payments (order_id, amount, payment_method, payment_status,
                              manual_payment_screenshot_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, order_id, amount, payment_method, payment_status,
                  manual_payment_screenshot_url, created_at
        ",
    )
    .bind(order_id)
    .bind(amount)
    .bind(method)
    .bind(status)
    .bind(screenshot_url)
    .fetch_one(&mut *conn)
    .await?;

    Ok(payment)
}
