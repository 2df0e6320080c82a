//! Cart routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use trendmart_core::{CartItemId, VariantId};

use crate::db::carts::CartRepository;
use crate::db::catalog;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::CartItem;
use crate::models::catalog::VariantTree;
use crate::state::AppState;

/// Request to add a variant to the cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_variant_id: VariantId,
    pub quantity: i32,
}

/// A cart line with its variant resolved for display.
#[derive(Debug, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product_variant: VariantTree,
}

/// Cart contents for the current user.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<CartLine>>, AppError> {
    let items = CartRepository::new(state.pool())
        .items_for_user(current.user_id)
        .await?;

    let variant_ids: Vec<i32> = items.iter().map(|i| i.product_variant_id.as_i32()).collect();
    let mut variants = catalog::variant_trees_by_ids(state.pool(), &variant_ids).await?;

    let lines = items
        .into_iter()
        .filter_map(|item| {
            variants
                .remove(&item.product_variant_id)
                .map(|product_variant| CartLine {
                    item,
                    product_variant,
                })
        })
        .collect();

    Ok(Json(lines))
}

/// Add a variant to the cart, folding duplicates into one line.
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>), AppError> {
    if request.quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be positive".to_owned()));
    }

    let item = CartRepository::new(state.pool())
        .upsert_item(current.user_id, request.product_variant_id, request.quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Request to change a cart line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// Set a cart line's quantity.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(item_id): Path<CartItemId>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartItem>, AppError> {
    if request.quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be positive".to_owned()));
    }

    let item = CartRepository::new(state.pool())
        .set_quantity(current.user_id, item_id, request.quantity)
        .await?;

    Ok(Json(item))
}

/// Remove a cart line.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<StatusCode, AppError> {
    CartRepository::new(state.pool())
        .remove_item(current.user_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
