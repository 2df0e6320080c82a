//! Customer administration routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;

use trendmart_core::UserId;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Address, User};
use crate::state::AppState;

use super::{PageQuery, Paginated};

/// A customer with their saved addresses.
#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<Address>,
}

/// Paginated customer listing.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<User>>, AppError> {
    let (items, total) = UserRepository::new(state.pool())
        .list_customers(page.skip(), page.take())
        .await?;

    Ok(Json(Paginated { items, total }))
}

/// Customer detail with addresses.
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<CustomerDetail>, AppError> {
    let (user, addresses) = UserRepository::new(state.pool()).get_customer(id).await?;
    Ok(Json(CustomerDetail { user, addresses }))
}
