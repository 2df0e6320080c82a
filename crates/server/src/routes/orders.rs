//! Order routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use trendmart_core::{AddressId, OrderId, OrderStatus, PaymentMethod, UserRole, VariantId};

use crate::db::orders::{OrderFilter, OrderRepository};
use crate::db::users::{AddressFields, UserRepository};
use crate::error::AppError;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Order, OrderDetail, OrderSummary};
use crate::services::checkout::{AddressSelection, CheckoutService, OrderLineRequest, PlaceOrder};
use crate::state::AppState;

use super::{PageQuery, Paginated};

/// One requested order line.
#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_variant_id: VariantId,
    pub quantity: i32,
}

/// A new shipping address submitted with an order.
#[derive(Debug, Deserialize)]
pub struct NewAddressRequest {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Where to ship: a saved address by id, or a new one.
///
/// Submitted as `{"existing": 3}` or `{"new": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingAddressRequest {
    Existing(AddressId),
    New(NewAddressRequest),
}

/// Request to place an order.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddressRequest,
    pub payment_method: PaymentMethod,
    pub payment_screenshot_url: Option<String>,
}

/// Filters for the order listing.
///
/// Pagination fields are spelled out rather than flattened from
/// [`PageQuery`]; serde's flatten does not survive urlencoded numbers.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub status: Option<OrderStatus>,
}

impl OrderListQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            skip: self.skip,
            take: self.take,
        }
    }
}

/// Request to transition an order's status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

impl From<PlaceOrderRequest> for PlaceOrder {
    fn from(request: PlaceOrderRequest) -> Self {
        Self {
            items: request
                .items
                .iter()
                .map(|item| OrderLineRequest {
                    variant_id: item.product_variant_id,
                    quantity: item.quantity,
                })
                .collect(),
            shipping_address: match request.shipping_address {
                ShippingAddressRequest::Existing(id) => AddressSelection::Existing(id),
                ShippingAddressRequest::New(address) => AddressSelection::New(AddressFields {
                    full_name: address.full_name,
                    phone_number: address.phone_number,
                    address_line1: address.address_line1,
                    city: address.city,
                    state: address.state,
                    postal_code: address.postal_code,
                    is_default: address.is_default,
                }),
            },
            payment_method: request.payment_method,
            payment_screenshot_url: request.payment_screenshot_url,
        }
    }
}

/// Place an order.
///
/// The order commits atomically; the confirmation email goes out afterwards
/// and is best-effort only.
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    let detail = CheckoutService::new(state.pool())
        .place_order(current.user_id, request.into())
        .await?;

    // The order is committed; nothing past this point may fail the request.
    let order_id = detail.order.id;
    let order_total = detail.order.order_total;
    let user_id = current.user_id;
    tokio::spawn(async move {
        let user = match UserRepository::new(state.pool()).get_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::error!(order_id = %order_id, user_id = %user_id, "Ordering user vanished before confirmation email");
                return;
            }
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "User lookup for confirmation email failed");
                return;
            }
        };

        if let Err(e) = state
            .email()
            .send_order_confirmation(user.email.as_str(), &user.full_name, order_id, order_total)
            .await
        {
            tracing::error!(order_id = %order_id, error = %e, "Order confirmation email failed");
        }
    });

    Ok((StatusCode::CREATED, Json(detail)))
}

/// List orders: customers see their own, admins see everything.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Paginated<OrderSummary>>, AppError> {
    let user_id = match current.role {
        UserRole::Admin => None,
        UserRole::Customer => Some(current.user_id),
    };

    let (items, total) = OrderRepository::new(state.pool())
        .list(OrderFilter {
            skip: query.page().skip(),
            take: query.page().take(),
            status: query.status,
            user_id,
        })
        .await?;

    Ok(Json(Paginated { items, total }))
}

/// Order detail; customers can only read their own.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let user_id = match current.role {
        UserRole::Admin => None,
        UserRole::Customer => Some(current.user_id),
    };

    let detail = OrderRepository::new(state.pool())
        .get_detail(id, user_id)
        .await?;
    Ok(Json(detail))
}

/// Transition an order's status.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, request.status)
        .await?;
    Ok(Json(order))
}
