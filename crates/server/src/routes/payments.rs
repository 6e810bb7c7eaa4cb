//! Payment verification handler.

use axum::{Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use shopdesk_core::OrderId;

use crate::error::{AppError, AppJson};
use crate::models::Order;
use crate::state::AppState;

/// Build the payments router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/payments/verify", post(verify))
}

/// Request to verify a payment reference against an order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: Option<OrderId>,
    pub reference: Option<String>,
}

/// Response for a verified payment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub message: &'static str,
    pub order: Order,
    /// False when the order was already paid with this reference.
    pub newly_recorded: bool,
}

async fn verify(
    State(state): State<AppState>,
    AppJson(body): AppJson<VerifyPaymentRequest>,
) -> Result<AppJson<VerifyPaymentResponse>, AppError> {
    let reference = body.reference.unwrap_or_default();
    let outcome = state.payments().verify(body.order_id, &reference).await?;

    Ok(AppJson(VerifyPaymentResponse {
        message: "Payment verified",
        order: outcome.order,
        newly_recorded: outcome.newly_recorded,
    }))
}
