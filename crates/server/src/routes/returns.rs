//! Return request routes.
//!
//! Approving a return never restores stock; returned goods are inspected
//! manually before any restock decision.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use trendmart_core::{OrderItemId, ReturnRequestId, ReturnStatus, UserRole};

use crate::db::returns::ReturnRepository;
use crate::error::AppError;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::ReturnRequest;
use crate::state::AppState;

use super::{PageQuery, Paginated};

/// Request to file a return.
#[derive(Debug, Deserialize)]
pub struct CreateReturnRequest {
    pub order_item_id: OrderItemId,
    pub reason: String,
}

/// Request to approve or reject a return.
#[derive(Debug, Deserialize)]
pub struct UpdateReturnStatusRequest {
    pub status: ReturnStatus,
}

/// File a return request for one of the caller's order items.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(request): Json<CreateReturnRequest>,
) -> Result<(StatusCode, Json<ReturnRequest>), AppError> {
    if request.reason.trim().is_empty() {
        return Err(AppError::BadRequest("a reason is required".to_owned()));
    }

    let created = ReturnRepository::new(state.pool())
        .create(current.user_id, request.order_item_id, request.reason.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// List returns: customers see their own, admins see everything.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<ReturnRequest>>, AppError> {
    let repo = ReturnRepository::new(state.pool());

    let (items, total) = match current.role {
        UserRole::Admin => repo.list(page.skip(), page.take()).await?,
        UserRole::Customer => {
            let items = repo.list_for_user(current.user_id).await?;
            let total = items.len() as i64;
            (items, total)
        }
    };

    Ok(Json(Paginated { items, total }))
}

/// Approve or reject a return request.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ReturnRequestId>,
    Json(request): Json<UpdateReturnStatusRequest>,
) -> Result<Json<ReturnRequest>, AppError> {
    let updated = ReturnRepository::new(state.pool())
        .set_status(id, request.status)
        .await?;
    Ok(Json(updated))
}
