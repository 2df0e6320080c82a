//! Catalog routes: products, variants, and lookup tables.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use trendmart_core::{CategoryId, ColorId, ImageId, Price, ProductId, SizeId};

use crate::db::catalog::CatalogRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::catalog::{Category, Color, ProductTree, Size};
use crate::services::catalog::{CatalogService, DesiredImage, DesiredVariant, ImageWrite};
use crate::state::AppState;

/// A variant as submitted by the admin dashboard.
#[derive(Debug, Deserialize)]
pub struct VariantRequest {
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub sku: Option<String>,
    /// Price in cents.
    pub price: Price,
    pub stock: i32,
    pub discount_percentage: Option<f64>,
    #[serde(default)]
    pub images: Vec<ImageRequest>,
}

/// An image as submitted by the admin dashboard.
///
/// `id` present means "update that image"; absent means "create".
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub id: Option<ImageId>,
    pub image_url: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Request to create a product.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub variants: Vec<VariantRequest>,
}

/// Request to reconcile a product's variants.
#[derive(Debug, Deserialize)]
pub struct UpdateVariantsRequest {
    pub variants: Vec<VariantRequest>,
}

/// Request to create a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

/// Request to create a color.
#[derive(Debug, Deserialize)]
pub struct CreateColorRequest {
    pub name: String,
    pub hex_code: Option<String>,
}

impl From<VariantRequest> for DesiredVariant {
    fn from(request: VariantRequest) -> Self {
        Self {
            size_id: request.size_id,
            color_id: request.color_id,
            sku: request.sku,
            price: request.price,
            stock: request.stock,
            discount_percentage: request.discount_percentage,
            images: request.images.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ImageRequest> for DesiredImage {
    fn from(request: ImageRequest) -> Self {
        Self {
            target: request.id.map_or(ImageWrite::New, ImageWrite::Existing),
            image_url: request.image_url,
            alt_text: request.alt_text,
            is_primary: request.is_primary,
        }
    }
}

/// Public product listing; archived variants are hidden.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductTree>>, AppError> {
    let products = CatalogRepository::new(state.pool())
        .list_products(false)
        .await?;
    Ok(Json(products))
}

/// Admin product listing, archived variants included.
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<ProductTree>>, AppError> {
    let products = CatalogRepository::new(state.pool())
        .list_products(true)
        .await?;
    Ok(Json(products))
}

/// Public product detail.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductTree>, AppError> {
    let product = CatalogRepository::new(state.pool())
        .product_tree(id, false)
        .await?;
    Ok(Json(product))
}

/// Create a product with its initial variants.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductTree>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("product name is required".to_owned()));
    }
    if request.variants.is_empty() {
        return Err(AppError::BadRequest(
            "at least one variant is required".to_owned(),
        ));
    }

    let product = CatalogService::new(state.pool())
        .create_product(
            request.name.trim(),
            request.description.as_deref(),
            &request.category_ids,
            request.variants.into_iter().map(Into::into).collect(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Converge a product's variants to the submitted set.
pub async fn update_variants(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(request): Json<UpdateVariantsRequest>,
) -> Result<Json<ProductTree>, AppError> {
    let product = CatalogService::new(state.pool())
        .update_variants(id, request.variants.into_iter().map(Into::into).collect())
        .await?;

    Ok(Json(product))
}

/// Category list.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    let categories = CatalogRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// Size list.
pub async fn sizes(State(state): State<AppState>) -> Result<Json<Vec<Size>>, AppError> {
    let sizes = CatalogRepository::new(state.pool()).list_sizes().await?;
    Ok(Json(sizes))
}

/// Color list.
pub async fn colors(State(state): State<AppState>) -> Result<Json<Vec<Color>>, AppError> {
    let colors = CatalogRepository::new(state.pool()).list_colors().await?;
    Ok(Json(colors))
}

/// Create a category.
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = CatalogRepository::new(state.pool())
        .create_category(request.name.trim(), request.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Create a color.
pub async fn create_color(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(request): Json<CreateColorRequest>,
) -> Result<(StatusCode, Json<Color>), AppError> {
    let color = CatalogRepository::new(state.pool())
        .create_color(request.name.trim(), request.hex_code.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(color)))
}
