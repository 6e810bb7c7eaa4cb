//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopdesk_core::{Email, OrderId, OrderStatus, ProductId};

/// Customer name and email captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: Email,
}

/// One line of an order, frozen at order time.
///
/// The product is referenced but never consulted again: name, image and
/// price are the values the customer saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    /// `price * quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Sum of all line totals, or `None` if any step overflows.
#[must_use]
pub fn items_total(items: &[OrderItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
}

/// Gateway receipt stored once a payment is verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    /// Gateway transaction id.
    pub id: String,
    /// Gateway reference the customer paid with.
    pub reference: String,
    /// Gateway status string (e.g. `success`).
    pub status: String,
    /// Payment channel (e.g. `card`, `bank`).
    pub channel: String,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Incremented by the store on every write; used for compare-and-swap.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Reference of the recorded payment, if any.
    #[must_use]
    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_result.as_ref().map(|p| p.reference.as_str())
    }
}

/// A validated order draft, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub idempotency_key: Option<String>,
}

/// Result of creating an order.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// `true` when an existing order was returned for a repeated idempotency key.
    pub replayed: bool,
}
