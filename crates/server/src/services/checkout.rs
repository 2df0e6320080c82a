//! Checkout service: atomic order placement.
//!
//! Placing an order validates the requested lines against live variant
//! rows, snapshots prices, writes the order graph, decrements stock with
//! an oversell guard, and clears the purchased cart lines, all inside one
//! transaction. The confirmation email happens after commit and never
//! fails the order.

use sqlx::PgPool;
use thiserror::Error;

use trendmart_core::{AddressId, PaymentMethod, PaymentStatus, Price, UserId, VariantId};

use crate::db::users::AddressFields;
use crate::db::{RepositoryError, carts, orders, users};
use crate::db::orders::OrderRepository;
use crate::models::OrderDetail;
use crate::models::catalog::ProductVariant;

/// One requested order line.
#[derive(Debug, Clone, Copy)]
pub struct OrderLineRequest {
    pub variant_id: VariantId,
    pub quantity: i32,
}

/// Where the order should ship: a saved address or a fresh one.
///
/// The caller always picks explicitly; placing an order never mutates a
/// previously saved address.
#[derive(Debug, Clone)]
pub enum AddressSelection {
    /// A saved address owned by the ordering user.
    Existing(AddressId),
    /// A new address, persisted as part of the order transaction.
    New(AddressFields),
}

/// A full order placement request, validated at the boundary.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: AddressSelection,
    pub payment_method: PaymentMethod,
    pub payment_screenshot_url: Option<String>,
}

/// A validated line with its price snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLine {
    pub variant_id: VariantId,
    pub quantity: i32,
    pub price_at_purchase: Price,
}

/// The outcome of planning an order against current variant rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Price,
}

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request carried no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A line had a non-positive quantity.
    #[error("invalid quantity for variant {0}")]
    InvalidQuantity(VariantId),

    /// A requested variant does not exist or is no longer sold.
    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    /// A line asked for more units than are in stock.
    #[error("insufficient stock for variant {variant_id}: {available} available, {requested} requested")]
    InsufficientStock {
        variant_id: VariantId,
        available: i32,
        requested: i32,
    },

    /// The selected saved address does not exist or belongs to someone else.
    #[error("shipping address not found")]
    AddressNotFound,

    /// The order total overflowed integer cents.
    #[error("order total overflow")]
    TotalOverflow,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order for a user.
    ///
    /// All writes happen in one transaction; on any failure nothing is
    /// persisted and stock is untouched.
    ///
    /// # Errors
    ///
    /// Returns the user-correctable [`CheckoutError`] variants for bad
    /// input, `CheckoutError::Repository` for persistence failures.
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: PlaceOrder,
    ) -> Result<OrderDetail, CheckoutError> {
        if request.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let variant_ids: Vec<VariantId> = request.items.iter().map(|l| l.variant_id).collect();
        let variants = orders::variants_by_ids(&mut tx, &variant_ids).await?;
        let plan = plan_order_lines(&request.items, &variants)?;

        let address = match request.shipping_address {
            AddressSelection::Existing(address_id) => {
                users::get_address(&mut tx, user_id, address_id)
                    .await?
                    .ok_or(CheckoutError::AddressNotFound)?
            }
            AddressSelection::New(ref fields) => {
                users::insert_address(&mut tx, user_id, fields).await?
            }
        };

        let order = orders::insert_order(&mut tx, user_id, address.id, plan.total).await?;

        for line in &plan.lines {
            orders::insert_order_item(
                &mut tx,
                order.id,
                line.variant_id,
                line.quantity,
                line.price_at_purchase,
            )
            .await?;
        }

        let payment_status = match request.payment_method {
            PaymentMethod::ManualUpload => PaymentStatus::VerificationPending,
            PaymentMethod::Stripe => PaymentStatus::Pending,
        };
        orders::insert_payment(
            &mut tx,
            order.id,
            plan.total,
            request.payment_method,
            payment_status,
            request.payment_screenshot_url.as_deref(),
        )
        .await?;

        // The conditional decrement is the oversell guard under concurrency;
        // the stock check in the plan only produces a friendlier error.
        for line in &plan.lines {
            let decremented =
                orders::decrement_stock(&mut tx, line.variant_id, line.quantity).await?;
            if !decremented {
                let current = orders::variants_by_ids(&mut tx, &[line.variant_id]).await?;
                let available = current.first().map_or(0, |v| v.stock);
                return Err(CheckoutError::InsufficientStock {
                    variant_id: line.variant_id,
                    available,
                    requested: line.quantity,
                });
            }
        }

        carts::clear_purchased(&mut tx, user_id, &variant_ids).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        let detail = OrderRepository::new(self.pool)
            .get_detail(order.id, None)
            .await?;
        Ok(detail)
    }
}

/// Validate requested lines against current variant rows and snapshot
/// prices, producing the exact writes to perform.
///
/// Pure with respect to the database; checkout calls it with rows read
/// inside its transaction.
///
/// # Errors
///
/// Returns `VariantNotFound` for unknown or archived variants,
/// `InsufficientStock` when a line exceeds available stock,
/// `InvalidQuantity` for non-positive quantities, and `TotalOverflow`
/// if the total leaves integer-cent range.
pub fn plan_order_lines(
    requested: &[OrderLineRequest],
    variants: &[ProductVariant],
) -> Result<OrderPlan, CheckoutError> {
    let mut lines = Vec::with_capacity(requested.len());
    let mut total = Price::ZERO;

    for line in requested {
        if line.quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity(line.variant_id));
        }

        let variant = variants
            .iter()
            .find(|v| v.id == line.variant_id && !v.is_archived)
            .ok_or(CheckoutError::VariantNotFound(line.variant_id))?;

        if variant.stock < line.quantity {
            return Err(CheckoutError::InsufficientStock {
                variant_id: line.variant_id,
                available: variant.stock,
                requested: line.quantity,
            });
        }

        let extension = variant
            .price
            .checked_mul(i64::from(line.quantity))
            .ok_or(CheckoutError::TotalOverflow)?;
        total = total
            .checked_add(extension)
            .ok_or(CheckoutError::TotalOverflow)?;

        lines.push(PlannedLine {
            variant_id: line.variant_id,
            quantity: line.quantity,
            price_at_purchase: variant.price,
        });
    }

    Ok(OrderPlan { lines, total })
}

#[cfg(test)]
mod tests {
    use trendmart_core::{ColorId, ProductId, SizeId};

    use super::*;

    fn variant(id: i32, price_cents: i64, stock: i32, archived: bool) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            product_id: ProductId::new(1),
            size_id: SizeId::new(1),
            color_id: ColorId::new(1),
            sku: format!("SKU-{id}"),
            price: Price::from_cents(price_cents),
            stock,
            discount_percentage: None,
            is_archived: archived,
        }
    }

    fn line(variant_id: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            variant_id: VariantId::new(variant_id),
            quantity,
        }
    }

    #[test]
    fn plan_snapshots_prices_and_sums_total() {
        // (M, Black) at $49.99 with stock 2, ordered in full
        let variants = vec![variant(1, 4999, 2, false)];
        let plan = plan_order_lines(&[line(1, 2)], &variants).expect("plan");

        assert_eq!(plan.total, Price::from_cents(9998));
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].price_at_purchase, Price::from_cents(4999));
        assert_eq!(plan.lines[0].quantity, 2);
    }

    #[test]
    fn plan_sums_across_lines() {
        let variants = vec![variant(1, 4999, 5, false), variant(2, 1500, 3, false)];
        let plan = plan_order_lines(&[line(1, 2), line(2, 3)], &variants).expect("plan");

        assert_eq!(plan.total, Price::from_cents(2 * 4999 + 3 * 1500));
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let variants = vec![variant(1, 4999, 2, false)];
        let err = plan_order_lines(&[line(2, 1)], &variants).unwrap_err();
        assert!(matches!(err, CheckoutError::VariantNotFound(id) if id == VariantId::new(2)));
    }

    #[test]
    fn archived_variant_is_rejected() {
        let variants = vec![variant(1, 4999, 2, true)];
        let err = plan_order_lines(&[line(1, 1)], &variants).unwrap_err();
        assert!(matches!(err, CheckoutError::VariantNotFound(_)));
    }

    #[test]
    fn insufficient_stock_names_the_shortfall() {
        let variants = vec![variant(1, 4999, 2, false)];
        let err = plan_order_lines(&[line(1, 3)], &variants).unwrap_err();
        match err {
            CheckoutError::InsufficientStock {
                variant_id,
                available,
                requested,
            } => {
                assert_eq!(variant_id, VariantId::new(1));
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn any_failing_line_rejects_the_whole_plan() {
        let variants = vec![variant(1, 4999, 5, false), variant(2, 1500, 1, false)];
        let err = plan_order_lines(&[line(1, 1), line(2, 2)], &variants).unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let variants = vec![variant(1, 4999, 2, false)];
        assert!(matches!(
            plan_order_lines(&[line(1, 0)], &variants).unwrap_err(),
            CheckoutError::InvalidQuantity(_)
        ));
        assert!(matches!(
            plan_order_lines(&[line(1, -1)], &variants).unwrap_err(),
            CheckoutError::InvalidQuantity(_)
        ));
    }

    #[test]
    fn total_overflow_is_caught() {
        let variants = vec![variant(1, i64::MAX, i32::MAX, false)];
        assert!(matches!(
            plan_order_lines(&[line(1, 2)], &variants).unwrap_err(),
            CheckoutError::TotalOverflow
        ));
    }
}
