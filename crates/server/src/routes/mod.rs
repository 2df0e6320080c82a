//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (pings the database)
//!
//! # Auth
//! POST /auth/register/otp         - Start registration, email a code
//! POST /auth/register/verify      - Verify the code, get a token
//! POST /auth/login                - Customer login
//! POST /auth/admin/login          - Admin login
//! GET  /auth/me                   - Current account (requires auth)
//!
//! # Catalog
//! GET  /products                  - Product listing (live variants only)
//! GET  /products/{id}             - Product detail
//! GET  /categories                - Category list
//! GET  /sizes                     - Size list
//! GET  /colors                    - Color list
//! POST /products                  - Create product (admin)
//! PUT  /products/{id}/variants    - Reconcile a product's variants (admin)
//! GET  /admin/products            - Product listing incl. archived (admin)
//! POST /categories                - Create category (admin)
//! POST /colors                    - Create color (admin)
//!
//! # Orders
//! POST /orders                    - Place an order (requires auth)
//! GET  /orders                    - List orders (own; admins see all)
//! GET  /orders/{id}               - Order detail (own; admins any)
//! PUT  /orders/{id}/status        - Transition order status (admin)
//!
//! # Cart
//! GET    /cart                    - Cart contents (requires auth)
//! POST   /cart                    - Add a variant to the cart
//! PUT    /cart/{item_id}          - Set a cart line's quantity
//! DELETE /cart/{item_id}          - Remove a cart line
//!
//! # Returns
//! POST /returns                   - File a return request (requires auth)
//! GET  /returns                   - List returns (own; admins see all)
//! PUT  /returns/{id}/status       - Approve/reject a return (admin)
//!
//! # Customers
//! GET  /customers                 - Customer listing (admin)
//! GET  /customers/{id}            - Customer detail with addresses (admin)
//! ```

pub mod auth;
pub mod cart;
pub mod customers;
pub mod orders;
pub mod products;
pub mod returns;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for paginated listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

impl PageQuery {
    /// Offset into the result set.
    #[must_use]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    /// Page size, clamped to a sane range.
    #[must_use]
    pub fn take(&self) -> i64 {
        self.take
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// A page of results with the total count for the filter.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(health_ready))
        // Auth
        .route("/auth/register/otp", post(auth::request_registration))
        .route("/auth/register/verify", post(auth::verify_registration))
        .route("/auth/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/products", get(products::index).post(products::create))
        .route("/products/{id}", get(products::show))
        .route("/products/{id}/variants", put(products::update_variants))
        .route("/admin/products", get(products::admin_index))
        .route(
            "/categories",
            get(products::categories).post(products::create_category),
        )
        .route("/sizes", get(products::sizes))
        .route("/colors", get(products::colors).post(products::create_color))
        // Orders
        .route("/orders", post(orders::place).get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", put(orders::update_status))
        // Cart
        .route("/cart", get(cart::index).post(cart::add))
        .route("/cart/{item_id}", put(cart::update).delete(cart::remove))
        // Returns
        .route("/returns", post(returns::create).get(returns::index))
        .route("/returns/{id}/status", put(returns::update_status))
        // Customers
        .route("/customers", get(customers::index))
        .route("/customers/{id}", get(customers::show))
        .with_state(state)
}

/// Liveness check.
async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness check: verifies the database answers.
async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
