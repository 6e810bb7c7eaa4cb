//! Order lifecycle service.
//!
//! Owns the rules for placing orders and moving them through the status
//! graph defined by [`OrderStatus::next_statuses`]. Payment is not a status
//! change this service makes; see [`super::payments`].

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use shopdesk_core::{Email, OrderId, OrderStatus, Role};

use super::access::{Caller, authorize};
use crate::db::OrderStore;
use crate::error::AppError;
use crate::models::{
    CustomerSnapshot, NewOrder, Order, OrderItem, PlacedOrder, check_amount, items_total,
};

/// Longest accepted `Idempotency-Key`.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// A customer's checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDraft {
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
}

/// Order lifecycle manager.
pub struct OrderLifecycle<S> {
    store: S,
    strict_totals: bool,
}

impl<S: OrderStore> OrderLifecycle<S> {
    /// Create a lifecycle manager over `store`.
    ///
    /// With `strict_totals`, an order whose total differs from the sum of its
    /// lines is rejected instead of logged.
    #[must_use]
    pub const fn new(store: S, strict_totals: bool) -> Self {
        Self {
            store,
            strict_totals,
        }
    }

    /// Validate and persist a new `pending` order.
    ///
    /// Nothing is written when validation fails. A repeated
    /// `idempotency_key` returns the order created by the first request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` for an empty cart, a non-positive
    /// quantity, a negative price or total, a blank customer name, an
    /// oversized idempotency key, or (in strict mode) a mismatched total.
    /// Returns `AppError::Storage` if persistence fails.
    #[instrument(skip_all, fields(customer = %draft.customer.email, items = draft.items.len()))]
    pub async fn place_order(
        &self,
        draft: OrderDraft,
        idempotency_key: Option<String>,
    ) -> Result<PlacedOrder, AppError> {
        validate_draft(&draft)?;

        let idempotency_key = idempotency_key
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());
        if idempotency_key
            .as_ref()
            .is_some_and(|k| k.len() > MAX_IDEMPOTENCY_KEY_LEN)
        {
            return Err(AppError::InvalidRequest(format!(
                "idempotency key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }

        let computed = items_total(&draft.items).ok_or_else(|| {
            AppError::InvalidRequest("item totals exceed the supported amount".to_owned())
        })?;
        if computed != draft.total {
            if self.strict_totals {
                return Err(AppError::InvalidRequest(format!(
                    "total {} does not match item sum {computed}",
                    draft.total
                )));
            }
            warn!(
                submitted = %draft.total,
                computed = %computed,
                "Order total does not match item sum"
            );
        }

        let placed = self
            .store
            .create(NewOrder {
                customer: draft.customer,
                items: draft.items,
                total: draft.total,
                idempotency_key,
            })
            .await?;

        if placed.replayed {
            info!(order_id = %placed.order.id, "Returning existing order for idempotency key");
        } else {
            info!(order_id = %placed.order.id, total = %placed.order.total, "Order placed");
        }

        Ok(placed)
    }

    /// Fetch an order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist.
    pub async fn get_order(&self, id: OrderId) -> Result<Order, AppError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if the query fails.
    pub async fn orders_for_customer(&self, email: &Email) -> Result<Vec<Order>, AppError> {
        Ok(self.store.list_by_customer_email(email).await?)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if the query fails.
    pub async fn all_orders(&self) -> Result<Vec<Order>, AppError> {
        Ok(self.store.list_all().await?)
    }

    /// Move an order to `new_status`.
    ///
    /// Only admins may change status. `paid` is never set here: an order
    /// becomes paid only when a payment is verified.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers,
    /// `AppError::NotFound` for unknown orders,
    /// `AppError::InvalidTransition` when the status graph forbids the move,
    /// `AppError::Conflict` when targeting `paid` or when the order changed
    /// concurrently.
    #[instrument(skip_all, fields(order_id = %id, new_status = %new_status))]
    pub async fn set_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        caller: Option<&Caller>,
    ) -> Result<Order, AppError> {
        authorize(caller, Role::Admin)?;

        let mut order = self.get_order(id).await?;
        let from = order.status;

        if !from.can_transition_to(new_status) {
            return Err(AppError::InvalidTransition {
                from,
                to: new_status,
            });
        }
        if new_status == OrderStatus::Paid && !order.is_paid {
            return Err(AppError::Conflict(
                "orders become paid only through payment verification".to_owned(),
            ));
        }

        order.status = new_status;
        let updated = self.store.update(&order).await?;

        info!(from = %from, to = %updated.status, "Order status changed");
        Ok(updated)
    }

    /// Hard-delete an order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist.
    pub async fn delete_order(&self, id: OrderId) -> Result<(), AppError> {
        self.store.delete(id).await?;
        info!(order_id = %id, "Order deleted");
        Ok(())
    }
}

fn validate_draft(draft: &OrderDraft) -> Result<(), AppError> {
    if draft.customer.name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "customer name is required".to_owned(),
        ));
    }
    if draft.items.is_empty() {
        return Err(AppError::InvalidRequest(
            "order must contain at least one item".to_owned(),
        ));
    }
    for (index, item) in draft.items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(AppError::InvalidRequest(format!(
                "item {index} ({}) must have a positive quantity",
                item.name
            )));
        }
        check_amount(item.price).map_err(|e| {
            AppError::InvalidRequest(format!("item {index} ({}) price {e}", item.name))
        })?;
    }
    check_amount(draft.total).map_err(|e| AppError::InvalidRequest(format!("total {e}")))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopdesk_core::{ProductId, UserId};

    use super::*;
    use crate::db::memory::MemoryOrderStore;
    use crate::error::ErrorKind;

    fn widget(quantity: i32, price: i64) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(1),
            name: "Widget".to_owned(),
            image: "/img/widget.png".to_owned(),
            price: Decimal::new(price, 0),
            quantity,
        }
    }

    fn draft(items: Vec<OrderItem>, total: i64) -> OrderDraft {
        OrderDraft {
            customer: CustomerSnapshot {
                name: "Jane Doe".to_owned(),
                email: Email::parse("jane@shop.test").unwrap(),
            },
            items,
            total: Decimal::new(total, 0),
        }
    }

    fn admin() -> Caller {
        Caller::new(UserId::new(1), Role::Admin)
    }

    #[tokio::test]
    async fn test_place_order_starts_pending() {
        let store = MemoryOrderStore::new();
        let lifecycle = OrderLifecycle::new(store, false);

        let items = vec![widget(2, 10)];
        let placed = lifecycle
            .place_order(draft(items.clone(), 20), None)
            .await
            .unwrap();

        assert!(!placed.replayed);
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert!(!placed.order.is_paid);
        assert!(placed.order.paid_at.is_none());
        assert!(placed.order.payment_result.is_none());
        assert_eq!(placed.order.items, items);
    }

    #[tokio::test]
    async fn test_place_order_rejects_empty_cart_without_writing() {
        let store = MemoryOrderStore::new();
        let lifecycle = OrderLifecycle::new(store.clone(), false);

        let err = lifecycle.place_order(draft(vec![], 0), None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_place_order_rejects_bad_lines() {
        let lifecycle = OrderLifecycle::new(MemoryOrderStore::new(), false);

        for items in [vec![widget(0, 10)], vec![widget(-1, 10)], vec![widget(1, -5)]] {
            let err = lifecycle.place_order(draft(items, 10), None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }

        let err = lifecycle
            .place_order(draft(vec![widget(1, 10)], -10), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_overflowing_line_is_invalid_request() {
        let store = MemoryOrderStore::new();
        let lifecycle = OrderLifecycle::new(store.clone(), false);
        let mut item = widget(2, 0);
        item.price = Decimal::MAX;
        let mut order = draft(vec![item], 0);
        order.total = Decimal::MAX;

        let err = lifecycle.place_order(order, None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_amounts_must_fit_money_columns() {
        let store = MemoryOrderStore::new();
        let lifecycle = OrderLifecycle::new(store.clone(), false);

        let mut precise_price = widget(1, 0);
        precise_price.price = Decimal::new(10_005, 3);
        let mut precise_total = draft(vec![widget(1, 10)], 0);
        precise_total.total = Decimal::new(10_005, 3);
        let huge_total = draft(vec![widget(1, 10)], 10_000_000_000);
        let huge_price = draft(vec![widget(1, 10_000_000_000)], 10);

        for order in [draft(vec![precise_price], 10), precise_total, huge_total, huge_price] {
            let err = lifecycle.place_order(order, None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
        assert!(store.is_empty().await);

        let mut largest = draft(vec![widget(1, 0)], 0);
        largest.items[0].price = Decimal::new(999_999_999_999, 2);
        largest.total = Decimal::new(999_999_999_999, 2);
        assert!(lifecycle.place_order(largest, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_total_mismatch_is_kept_unless_strict() {
        let lenient = OrderLifecycle::new(MemoryOrderStore::new(), false);
        let placed = lenient
            .place_order(draft(vec![widget(2, 10)], 15), None)
            .await
            .unwrap();
        assert_eq!(placed.order.total, Decimal::new(15, 0));

        let strict = OrderLifecycle::new(MemoryOrderStore::new(), true);
        let err = strict
            .place_order(draft(vec![widget(2, 10)], 15), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_idempotency_key_replays() {
        let store = MemoryOrderStore::new();
        let lifecycle = OrderLifecycle::new(store.clone(), false);

        let first = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), Some("checkout-42".to_owned()))
            .await
            .unwrap();
        let second = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), Some(" checkout-42 ".to_owned()))
            .await
            .unwrap();

        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_set_status_follows_graph() {
        let lifecycle = OrderLifecycle::new(MemoryOrderStore::new(), false);
        let order = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), None)
            .await
            .unwrap()
            .order;
        let caller = admin();

        let processing = lifecycle
            .set_status(order.id, OrderStatus::Processing, Some(&caller))
            .await
            .unwrap();
        assert_eq!(processing.status, OrderStatus::Processing);
        assert!(processing.updated_at >= order.updated_at);

        let err = lifecycle
            .set_status(order.id, OrderStatus::Delivered, Some(&caller))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_set_status_cannot_mark_paid() {
        let lifecycle = OrderLifecycle::new(MemoryOrderStore::new(), false);
        let order = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), None)
            .await
            .unwrap()
            .order;
        let caller = admin();
        lifecycle
            .set_status(order.id, OrderStatus::Processing, Some(&caller))
            .await
            .unwrap();

        let err = lifecycle
            .set_status(order.id, OrderStatus::Paid, Some(&caller))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            lifecycle.get_order(order.id).await.unwrap().status,
            OrderStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() {
        let lifecycle = OrderLifecycle::new(MemoryOrderStore::new(), false);
        let order = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), None)
            .await
            .unwrap()
            .order;
        let caller = admin();
        lifecycle
            .set_status(order.id, OrderStatus::Cancelled, Some(&caller))
            .await
            .unwrap();

        for next in OrderStatus::ALL {
            let err = lifecycle
                .set_status(order.id, next, Some(&caller))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict, "cancelled -> {next}");
        }
    }

    #[tokio::test]
    async fn test_set_status_requires_admin() {
        let lifecycle = OrderLifecycle::new(MemoryOrderStore::new(), false);
        let order = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), None)
            .await
            .unwrap()
            .order;
        let customer = Caller::new(UserId::new(9), Role::Customer);

        let err = lifecycle
            .set_status(order.id, OrderStatus::Cancelled, Some(&customer))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = lifecycle
            .set_status(order.id, OrderStatus::Cancelled, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(
            lifecycle.get_order(order.id).await.unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_orders_for_customer_newest_first() {
        let lifecycle = OrderLifecycle::new(MemoryOrderStore::new(), false);
        let first = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), None)
            .await
            .unwrap()
            .order;
        let second = lifecycle
            .place_order(draft(vec![widget(2, 10)], 20), None)
            .await
            .unwrap()
            .order;

        let email = Email::parse("JANE@shop.test").unwrap();
        let orders = lifecycle.orders_for_customer(&email).await.unwrap();
        let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let other = Email::parse("someone@else.test").unwrap();
        assert!(lifecycle.orders_for_customer(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_delete_missing_order() {
        let lifecycle = OrderLifecycle::new(MemoryOrderStore::new(), false);
        assert_eq!(
            lifecycle.get_order(OrderId::new(77)).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            lifecycle.delete_order(OrderId::new(77)).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let store = MemoryOrderStore::new();
        store.set_unavailable(true);
        let lifecycle = OrderLifecycle::new(store, false);

        let err = lifecycle
            .place_order(draft(vec![widget(1, 10)], 10), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
    }
}
