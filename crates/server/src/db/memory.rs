//! In-memory stores for tests.
//!
//! Same contracts as the `PostgreSQL` repositories: version compare-and-swap
//! on order updates, conditional payment writes, idempotent order creation
//! and admin-protected user deletion. Each store is cheaply cloneable and
//! clones share state.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use shopdesk_core::{Email, OrderId, OrderStatus, ProductId, UserId};

use super::{OrderStore, PaymentRecord, ProductStore, RepositoryError, UserStore};
use crate::models::{
    NewOrder, NewProduct, NewUser, Order, PaymentResult, PlacedOrder, Product, User,
};

struct Table<T> {
    next_id: i32,
    rows: BTreeMap<i32, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

struct Shared<T> {
    table: RwLock<Table<T>>,
    unavailable: AtomicBool,
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            unavailable: AtomicBool::new(false),
        }
    }
}

impl<T> Shared<T> {
    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

/// Newest first, ties broken by id.
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

// =============================================================================
// Orders
// =============================================================================

/// In-memory [`OrderStore`].
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    shared: Arc<Shared<Order>>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.shared.table.read().await.rows.len()
    }

    /// Whether the store holds no orders.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl OrderStore for MemoryOrderStore {
    fn create(
        &self,
        draft: NewOrder,
    ) -> impl Future<Output = Result<PlacedOrder, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;

            if let Some(key) = draft.idempotency_key.as_deref()
                && let Some(existing) = table
                    .rows
                    .values()
                    .find(|o| o.idempotency_key.as_deref() == Some(key))
            {
                return Ok(PlacedOrder {
                    order: existing.clone(),
                    replayed: true,
                });
            }

            let id = table.allocate_id();
            let now = Utc::now();
            let order = Order {
                id: OrderId::new(id),
                customer: draft.customer,
                items: draft.items,
                total: draft.total,
                status: OrderStatus::Pending,
                is_paid: false,
                paid_at: None,
                payment_result: None,
                idempotency_key: draft.idempotency_key,
                version: 1,
                created_at: now,
                updated_at: now,
            };
            table.rows.insert(id, order.clone());

            Ok(PlacedOrder {
                order,
                replayed: false,
            })
        }
    }

    fn get_by_id(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            Ok(self.shared.table.read().await.rows.get(&id.as_i32()).cloned())
        }
    }

    fn list_by_customer_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut orders: Vec<Order> = self
                .shared
                .table
                .read()
                .await
                .rows
                .values()
                .filter(|o| &o.customer.email == email)
                .cloned()
                .collect();
            newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
            Ok(orders)
        }
    }

    fn list_all(&self) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut orders: Vec<Order> =
                self.shared.table.read().await.rows.values().cloned().collect();
            newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
            Ok(orders)
        }
    }

    fn update(&self, order: &Order) -> impl Future<Output = Result<Order, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;
            let stored = table
                .rows
                .get_mut(&order.id.as_i32())
                .ok_or(RepositoryError::NotFound)?;

            if stored.version != order.version {
                return Err(RepositoryError::Conflict(format!(
                    "order {} was modified concurrently",
                    order.id
                )));
            }

            stored.status = order.status;
            stored.version += 1;
            stored.updated_at = Utc::now();
            Ok(stored.clone())
        }
    }

    fn record_payment(
        &self,
        id: OrderId,
        payment: &PaymentResult,
        paid_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<PaymentRecord, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;
            let Some(stored) = table.rows.get_mut(&id.as_i32()) else {
                return Ok(PaymentRecord::Missing);
            };

            if stored.is_paid {
                return Ok(PaymentRecord::AlreadyPaid(stored.clone()));
            }
            if !stored.status.accepts_payment() {
                return Ok(PaymentRecord::NotPayable(stored.clone()));
            }

            stored.is_paid = true;
            stored.status = OrderStatus::Paid;
            stored.paid_at = Some(paid_at);
            stored.payment_result = Some(payment.clone());
            stored.version += 1;
            stored.updated_at = Utc::now();
            Ok(PaymentRecord::Recorded(stored.clone()))
        }
    }

    fn delete(&self, id: OrderId) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            self.shared
                .table
                .write()
                .await
                .rows
                .remove(&id.as_i32())
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// In-memory [`UserStore`].
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    shared: Arc<Shared<User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl UserStore for MemoryUserStore {
    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            Ok(self.shared.table.read().await.rows.get(&id.as_i32()).cloned())
        }
    }

    fn list_all(&self) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut users: Vec<User> =
                self.shared.table.read().await.rows.values().cloned().collect();
            newest_first(&mut users, |u| (u.created_at, u.id.as_i32()));
            Ok(users)
        }
    }

    fn create(&self, user: NewUser) -> impl Future<Output = Result<User, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;
            if table.rows.values().any(|u| u.email == user.email) {
                return Err(RepositoryError::Conflict("email already exists".to_owned()));
            }

            let id = table.allocate_id();
            let now = Utc::now();
            let created = User {
                id: UserId::new(id),
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                is_admin: user.is_admin,
                created_at: now,
                updated_at: now,
            };
            table.rows.insert(id, created.clone());
            Ok(created)
        }
    }

    fn set_admin(
        &self,
        id: UserId,
        is_admin: bool,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;
            let stored = table
                .rows
                .get_mut(&id.as_i32())
                .ok_or(RepositoryError::NotFound)?;
            stored.is_admin = is_admin;
            stored.updated_at = Utc::now();
            Ok(stored.clone())
        }
    }

    fn delete_non_admin(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;
            match table.rows.get(&id.as_i32()).map(|u| u.is_admin) {
                None => Err(RepositoryError::NotFound),
                Some(true) => Err(RepositoryError::Conflict(
                    "admin accounts cannot be deleted".to_owned(),
                )),
                Some(false) => {
                    table.rows.remove(&id.as_i32());
                    Ok(())
                }
            }
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// In-memory [`ProductStore`].
#[derive(Clone, Default)]
pub struct MemoryProductStore {
    shared: Arc<Shared<Product>>,
}

impl MemoryProductStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for MemoryProductStore {
    fn get_by_id(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            Ok(self.shared.table.read().await.rows.get(&id.as_i32()).cloned())
        }
    }

    fn list_all(&self) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut products: Vec<Product> =
                self.shared.table.read().await.rows.values().cloned().collect();
            newest_first(&mut products, |p| (p.created_at, p.id.as_i32()));
            Ok(products)
        }
    }

    fn create(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;
            let id = table.allocate_id();
            let now = Utc::now();
            let created = Product {
                id: ProductId::new(id),
                name: product.name,
                price: product.price,
                description: product.description,
                image: product.image,
                category: product.category,
                stock: product.stock,
                created_at: now,
                updated_at: now,
            };
            table.rows.insert(id, created.clone());
            Ok(created)
        }
    }

    fn update(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            let mut table = self.shared.table.write().await;
            let stored = table
                .rows
                .get_mut(&product.id.as_i32())
                .ok_or(RepositoryError::NotFound)?;
            *stored = Product {
                created_at: stored.created_at,
                updated_at: Utc::now(),
                ..product.clone()
            };
            Ok(stored.clone())
        }
    }

    fn delete(&self, id: ProductId) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async move {
            self.shared.check_available()?;
            self.shared
                .table
                .write()
                .await
                .rows
                .remove(&id.as_i32())
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{CustomerSnapshot, OrderItem};

    fn draft(key: Option<&str>) -> NewOrder {
        NewOrder {
            customer: CustomerSnapshot {
                name: "Jane".to_owned(),
                email: Email::parse("jane@shop.test").unwrap(),
            },
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                name: "Widget".to_owned(),
                image: "/w.png".to_owned(),
                price: Decimal::new(10, 0),
                quantity: 2,
            }],
            total: Decimal::new(20, 0),
            idempotency_key: key.map(str::to_owned),
        }
    }

    fn receipt(reference: &str) -> PaymentResult {
        PaymentResult {
            id: "4099260516".to_owned(),
            reference: reference.to_owned(),
            status: "success".to_owned(),
            channel: "card".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent_by_key() {
        let store = MemoryOrderStore::new();
        let first = store.create(draft(Some("k-1"))).await.unwrap();
        let second = store.create(draft(Some("k-1"))).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_rejects_stale_version() {
        let store = MemoryOrderStore::new();
        let order = store.create(draft(None)).await.unwrap().order;

        let mut first = order.clone();
        first.status = OrderStatus::Processing;
        let updated = store.update(&first).await.unwrap();
        assert_eq!(updated.version, order.version + 1);

        let mut stale = order;
        stale.status = OrderStatus::Cancelled;
        let err = store.update(&stale).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_record_payment_outcomes() {
        let store = MemoryOrderStore::new();
        let order = store.create(draft(None)).await.unwrap().order;

        let recorded = store
            .record_payment(order.id, &receipt("ref123"), Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            recorded,
            PaymentRecord::Recorded(ref o) if o.status == OrderStatus::Paid
        ));

        let again = store
            .record_payment(order.id, &receipt("ref123"), Utc::now())
            .await
            .unwrap();
        assert!(matches!(again, PaymentRecord::AlreadyPaid(_)));

        let missing = store
            .record_payment(OrderId::new(999), &receipt("ref123"), Utc::now())
            .await
            .unwrap();
        assert!(matches!(missing, PaymentRecord::Missing));
    }

    #[tokio::test]
    async fn test_record_payment_refuses_cancelled_order() {
        let store = MemoryOrderStore::new();
        let mut order = store.create(draft(None)).await.unwrap().order;
        order.status = OrderStatus::Cancelled;
        store.update(&order).await.unwrap();

        let outcome = store
            .record_payment(order.id, &receipt("ref123"), Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, PaymentRecord::NotPayable(_)));
    }

    #[tokio::test]
    async fn test_delete_non_admin_protects_admins() {
        let store = MemoryUserStore::new();
        let admin = store
            .create(NewUser {
                name: "Admin".to_owned(),
                email: Email::parse("admin@shop.test").unwrap(),
                password_hash: "hash".to_owned(),
                is_admin: true,
            })
            .await
            .unwrap();

        let err = store.delete_non_admin(admin.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(store.get_by_id(admin.id).await.unwrap().is_some());

        let err = store.delete_non_admin(UserId::new(404)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryOrderStore::new();
        store.set_unavailable(true);
        let err = store.list_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
