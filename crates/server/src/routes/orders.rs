//! Customer-facing order handlers.

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use shopdesk_core::{Email, OrderId};

use super::parse_id;
use crate::error::{AppError, AppJson, AppQuery};
use crate::models::Order;
use crate::services::OrderDraft;
use crate::state::AppState;

/// Header carrying the client-chosen idempotency key for order placement.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(place_order).get(list_for_customer))
        .route("/api/orders/{id}", get(show))
}

/// Response for a placed order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub order: Order,
}

/// Query for listing a customer's orders.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrdersQuery {
    pub customer_email: Option<String>,
}

/// Place an order.
///
/// Responds 201 for a new order and 200 when the idempotency key matched an
/// existing one.
async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(draft): AppJson<OrderDraft>,
) -> Result<(StatusCode, AppJson<PlaceOrderResponse>), AppError> {
    let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        None => None,
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| {
                    AppError::InvalidRequest("idempotency key must be visible ASCII".to_owned())
                })?
                .to_owned(),
        ),
    };

    let placed = state.orders().place_order(draft, idempotency_key).await?;
    let status = if placed.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        AppJson(PlaceOrderResponse {
            message: "Order created",
            order_id: placed.order.id,
            order: placed.order,
        }),
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<AppJson<Order>, AppError> {
    let id: OrderId = parse_id(&raw_id)?;
    Ok(AppJson(state.orders().get_order(id).await?))
}

async fn list_for_customer(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CustomerOrdersQuery>,
) -> Result<AppJson<Vec<Order>>, AppError> {
    let raw = query
        .customer_email
        .ok_or_else(|| AppError::InvalidRequest("customerEmail is required".to_owned()))?;
    let email = Email::parse(&raw).map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    Ok(AppJson(state.orders().orders_for_customer(&email).await?))
}
