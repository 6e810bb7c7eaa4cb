//! Admin API handlers.
//!
//! Every route here sits behind [`require_admin`](crate::middleware::require_admin),
//! which inserts the resolved [`Caller`]. The services check the role again.

use axum::{
    Extension, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
};
use serde::{Deserialize, Serialize};

use shopdesk_core::{OrderId, ProductId, UserId};

use super::parse_id;
use crate::error::{AppError, AppJson};
use crate::models::{NewProduct, Order, Product, ProductPatch, PublicUser};
use crate::services::{Caller, OrderUpdate};
use crate::state::AppState;

/// Build the admin router. The admin guard is layered on by the caller.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}", delete(delete_user))
        .route("/api/admin/users/{id}/role", put(set_user_role))
        .route("/api/admin/orders", get(list_orders))
        .route(
            "/api/admin/orders/{id}",
            put(update_order).delete(delete_order),
        )
        .route("/api/admin/products", get(list_products).post(create_product))
        .route(
            "/api/admin/products/{id}",
            put(update_product).delete(delete_product),
        )
}

/// Plain acknowledgement for deletions.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Body for granting or revoking admin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub is_admin: bool,
}

// =============================================================================
// Users
// =============================================================================

async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<AppJson<Vec<PublicUser>>, AppError> {
    Ok(AppJson(state.admin().list_users(Some(&caller)).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(raw_id): Path<String>,
) -> Result<AppJson<MessageResponse>, AppError> {
    let id: UserId = parse_id(&raw_id)?;
    state.admin().delete_user(Some(&caller), id).await?;
    Ok(AppJson(MessageResponse {
        message: "User removed",
    }))
}

async fn set_user_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(raw_id): Path<String>,
    AppJson(body): AppJson<RoleRequest>,
) -> Result<AppJson<PublicUser>, AppError> {
    let id: UserId = parse_id(&raw_id)?;
    let user = state
        .admin()
        .set_user_role(Some(&caller), id, body.is_admin)
        .await?;
    Ok(AppJson(user))
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<AppJson<Vec<Order>>, AppError> {
    Ok(AppJson(state.admin().list_orders(Some(&caller)).await?))
}

async fn update_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(raw_id): Path<String>,
    AppJson(update): AppJson<OrderUpdate>,
) -> Result<AppJson<Order>, AppError> {
    let id: OrderId = parse_id(&raw_id)?;
    let order = state.admin().update_order(Some(&caller), id, update).await?;
    Ok(AppJson(order))
}

async fn delete_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(raw_id): Path<String>,
) -> Result<AppJson<MessageResponse>, AppError> {
    let id: OrderId = parse_id(&raw_id)?;
    state.admin().delete_order(Some(&caller), id).await?;
    Ok(AppJson(MessageResponse {
        message: "Order removed",
    }))
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<AppJson<Vec<Product>>, AppError> {
    Ok(AppJson(state.admin().list_products(Some(&caller)).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(product): AppJson<NewProduct>,
) -> Result<(StatusCode, AppJson<Product>), AppError> {
    let product = state.admin().create_product(Some(&caller), product).await?;
    Ok((StatusCode::CREATED, AppJson(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(raw_id): Path<String>,
    AppJson(patch): AppJson<ProductPatch>,
) -> Result<AppJson<Product>, AppError> {
    let id: ProductId = parse_id(&raw_id)?;
    let product = state
        .admin()
        .update_product(Some(&caller), id, patch)
        .await?;
    Ok(AppJson(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(raw_id): Path<String>,
) -> Result<AppJson<MessageResponse>, AppError> {
    let id: ProductId = parse_id(&raw_id)?;
    state.admin().delete_product(Some(&caller), id).await?;
    Ok(AppJson(MessageResponse {
        message: "Product removed",
    }))
}
