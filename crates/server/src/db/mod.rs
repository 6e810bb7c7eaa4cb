//! Persistence for Shopdesk.
//!
//! # Tables
//!
//! - `users` - Accounts with an admin flag and an argon2 password hash
//! - `products` - Catalog records managed through the admin API
//! - `orders` - Orders with item snapshot (JSONB), status and payment receipt
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p shopdesk-cli -- migrate
//! ```
//!
//! # Stores
//!
//! Services talk to the store traits below, never to `sqlx` directly. The
//! `PostgreSQL` repositories are the production implementation; the
//! in-memory stores in [`memory`] back tests.

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shopdesk_core::{Email, OrderId, ProductId, UserId};

use crate::models::{
    NewOrder, NewProduct, NewUser, Order, PaymentResult, PlacedOrder, Product, User,
};

pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or stale version.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Outcome of a conditional payment write.
#[derive(Debug, Clone)]
pub enum PaymentRecord {
    /// The order was unpaid and payable; it is now `paid`.
    Recorded(Order),
    /// The order already carries a payment. Nothing was written.
    AlreadyPaid(Order),
    /// The order is unpaid but its status does not accept payment.
    NotPayable(Order),
    /// No order with that id.
    Missing,
}

/// Persistence for orders. No business rules live here.
pub trait OrderStore: Send + Sync {
    /// Insert an order. A repeated idempotency key returns the existing
    /// order with `replayed = true`.
    fn create(
        &self,
        draft: NewOrder,
    ) -> impl Future<Output = Result<PlacedOrder, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Orders placed with `email`, newest first.
    fn list_by_customer_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// All orders, newest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Write the mutable fields of `order` if its `version` is still current.
    ///
    /// Fails with `Conflict` on a stale version and `NotFound` when the row
    /// is gone. The returned order carries the bumped version.
    fn update(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Mark an order paid in one conditional write.
    fn record_payment(
        &self,
        id: OrderId,
        payment: &PaymentResult,
        paid_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<PaymentRecord, RepositoryError>> + Send;

    fn delete(&self, id: OrderId) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Persistence for user accounts.
pub trait UserStore: Send + Sync {
    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// All users, newest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// Insert a user. Fails with `Conflict` if the email is taken.
    fn create(
        &self,
        user: NewUser,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    fn set_admin(
        &self,
        id: UserId,
        is_admin: bool,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Delete a user unless it is an admin.
    ///
    /// Fails with `Conflict` when the target is an admin and `NotFound`
    /// when it does not exist.
    fn delete_non_admin(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Persistence for catalog products.
pub trait ProductStore: Send + Sync {
    fn get_by_id(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// All products, newest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    fn create(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    /// Overwrite the editable fields of an existing product.
    fn update(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    fn delete(&self, id: ProductId)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
fn map_unique_violation(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}
