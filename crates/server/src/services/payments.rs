//! Payment verification service.
//!
//! Asks the gateway whether a transaction reference is a completed payment
//! and, if so, records it against the order in one conditional write:
//!
//! 1. Validate input (order id present, reference not blank)
//! 2. Call the gateway once, bounded by a timeout, no retries
//! 3. Declined: report `PaymentNotVerified` and write nothing
//! 4. Verified: mark the order paid unless it is already paid or not payable
//!
//! Verifying the same reference twice is safe: the second call finds the
//! order already paid with that reference and returns it unchanged.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use shopdesk_core::OrderId;

use crate::db::{OrderStore, PaymentRecord};
use crate::error::AppError;
use crate::models::{Order, PaymentResult};
use crate::paystack::GatewayError;

/// A gateway's verdict on one transaction reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayVerification {
    /// Whether the transaction is a completed payment.
    pub success: bool,
    /// Gateway transaction id.
    pub id: String,
    /// Reference the gateway reports for the transaction.
    pub reference: String,
    /// Gateway transaction status (e.g. `success`, `failed`, `abandoned`).
    pub status: String,
    /// Payment channel (e.g. `card`).
    pub channel: String,
    /// Amount charged, in the currency's subunit, when the gateway reports it.
    pub amount: Option<u64>,
    /// Gateway message, for logs.
    pub message: String,
}

/// An external payment gateway.
pub trait PaymentGateway: Send + Sync {
    /// Look up `reference` with the gateway.
    ///
    /// A reachable gateway that declines the reference returns
    /// `Ok` with `success == false`.
    fn verify(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<GatewayVerification, GatewayError>> + Send;
}

/// Result of a successful verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub order: Order,
    /// `false` when the order was already paid with this reference.
    pub newly_recorded: bool,
}

/// Reconciles gateway verdicts with order payment state.
pub struct PaymentVerifier<O, G> {
    orders: O,
    gateway: G,
    timeout: Duration,
}

impl<O: OrderStore, G: PaymentGateway> PaymentVerifier<O, G> {
    /// Create a verifier. `timeout` bounds the whole gateway call.
    #[must_use]
    pub const fn new(orders: O, gateway: G, timeout: Duration) -> Self {
        Self {
            orders,
            gateway,
            timeout,
        }
    }

    /// Verify `reference` with the gateway and record it on `order_id`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `order_id` is absent or `reference` is blank
    /// - `GatewayUnavailable` if the gateway times out or fails
    /// - `PaymentNotVerified` if the gateway declines the reference
    /// - `NotFound` if the order does not exist
    /// - `Conflict` if the order is paid with another reference or cannot
    ///   accept payment
    /// - `Storage` if the write fails
    #[instrument(skip_all, fields(order_id, reference = %reference.trim()))]
    pub async fn verify(
        &self,
        order_id: Option<OrderId>,
        reference: &str,
    ) -> Result<VerificationOutcome, AppError> {
        let reference = reference.trim();
        let (Some(order_id), false) = (order_id, reference.is_empty()) else {
            return Err(AppError::InvalidRequest(
                "Missing reference or order ID".to_owned(),
            ));
        };
        tracing::Span::current().record("order_id", order_id.as_i32());

        let verification = tokio::time::timeout(self.timeout, self.gateway.verify(reference))
            .await
            .map_err(|_| GatewayError::Timeout)??;

        if !verification.success {
            warn!(
                gateway_status = %verification.status,
                gateway_message = %verification.message,
                "Payment not verified by gateway"
            );
            return Err(AppError::PaymentNotVerified(format!(
                "gateway did not confirm payment for reference {reference}"
            )));
        }

        if verification.reference != reference {
            warn!(
                gateway_reference = %verification.reference,
                "Gateway receipt is for a different reference"
            );
            return Err(AppError::PaymentNotVerified(
                "gateway receipt does not match the reference".to_owned(),
            ));
        }

        let receipt = PaymentResult {
            id: verification.id,
            reference: verification.reference,
            status: verification.status,
            channel: verification.channel,
        };
        let charged = verification.amount;

        match self
            .orders
            .record_payment(order_id, &receipt, Utc::now())
            .await?
        {
            PaymentRecord::Recorded(order) => {
                if let Some(charged) = charged
                    && !charge_covers_total(order.total, charged)
                {
                    error!(
                        alert = true,
                        charged_subunits = charged,
                        order_total = %order.total,
                        "Verified payment amount differs from order total"
                    );
                }
                info!(channel = %receipt.channel, "Payment recorded");
                Ok(VerificationOutcome {
                    order,
                    newly_recorded: true,
                })
            }
            PaymentRecord::AlreadyPaid(order) if order.payment_reference() == Some(reference) => {
                info!("Payment already recorded for this reference");
                Ok(VerificationOutcome {
                    order,
                    newly_recorded: false,
                })
            }
            PaymentRecord::AlreadyPaid(order) => {
                error!(
                    alert = true,
                    recorded_reference = order.payment_reference().unwrap_or_default(),
                    "Verified payment for an order already paid with another reference"
                );
                Err(AppError::Conflict(format!(
                    "order {order_id} is already paid with a different reference"
                )))
            }
            PaymentRecord::NotPayable(order) => {
                error!(
                    alert = true,
                    status = %order.status,
                    "Verified payment for an order that cannot accept payment"
                );
                Err(AppError::Conflict(format!(
                    "order {order_id} is {} and cannot accept payment",
                    order.status
                )))
            }
            PaymentRecord::Missing => {
                error!(
                    alert = true,
                    "Verified payment for an order that does not exist"
                );
                Err(AppError::NotFound(format!("order {order_id}")))
            }
        }
    }
}

/// Whether `charged` subunits equal `total` in major units.
fn charge_covers_total(total: Decimal, charged: u64) -> bool {
    total
        .checked_mul(Decimal::ONE_HUNDRED)
        .is_some_and(|expected| expected == Decimal::from(charged))
}
