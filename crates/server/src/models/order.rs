//! Order, payment, cart, and return domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use trendmart_core::{
    AddressId, CartItemId, Email, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentMethod,
    PaymentStatus, Price, ReturnRequestId, ReturnStatus, UserId, VariantId,
};

use super::catalog::VariantTree;
use super::user::Address;

/// A customer order.
///
/// Created atomically with its items and payment; mutated afterwards only
/// by status transitions.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping_address_id: AddressId,
    /// Sum of `quantity * price_at_purchase` over the items, in cents.
    pub order_total: Price,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order, referencing a product variant.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_variant_id: VariantId,
    pub quantity: i32,
    /// Variant price captured at order time; immune to later catalog changes.
    pub price_at_purchase: Price,
}

/// The payment record attached 1:1 to an order.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Price,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub manual_payment_screenshot_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order row joined with its customer, for the admin list view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub customer_name: String,
    pub customer_email: Email,
}

/// An order with its full graph resolved, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub shipping_address: Address,
    pub items: Vec<OrderItemDetail>,
    pub payment: Option<Payment>,
}

/// An order item with its variant resolved (archived variants included,
/// so historical orders keep rendering after catalog changes).
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDetail {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product_variant: VariantTree,
}

/// A cart line for a user; removed entirely once its variant is purchased.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_variant_id: VariantId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A customer's request to return an order item.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReturnRequest {
    pub id: ReturnRequestId,
    pub order_item_id: OrderItemId,
    pub user_id: UserId,
    pub reason: String,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
