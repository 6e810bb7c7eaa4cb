//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::{OrderRepository, ProductRepository, UserRepository};
use crate::paystack::{GatewayError, PaystackClient};
use crate::services::{AdminService, OrderLifecycle, PaymentVerifier};

/// Order lifecycle over the `PostgreSQL` order table.
pub type PgOrderLifecycle<'a> = OrderLifecycle<OrderRepository<'a>>;

/// Payment verifier over the `PostgreSQL` order table and Paystack.
pub type PgPaymentVerifier<'a> = PaymentVerifier<OrderRepository<'a>, PaystackClient>;

/// Admin service over the `PostgreSQL` stores.
pub type PgAdminService<'a> =
    AdminService<UserRepository<'a>, OrderRepository<'a>, ProductRepository<'a>>;

/// Application state shared across all handlers.
///
/// Cheap to clone; all clones share the same pool and gateway client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    paystack: PaystackClient,
}

impl AppState {
    /// Create the application state.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the Paystack client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, GatewayError> {
        let paystack = PaystackClient::new(&config.paystack)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                paystack,
            }),
        })
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the Paystack client.
    #[must_use]
    pub fn paystack(&self) -> &PaystackClient {
        &self.inner.paystack
    }

    /// Order lifecycle bound to this state's pool.
    #[must_use]
    pub fn orders(&self) -> PgOrderLifecycle<'_> {
        OrderLifecycle::new(
            OrderRepository::new(self.pool()),
            self.config().strict_order_totals,
        )
    }

    /// Payment verifier bound to this state's pool and gateway.
    #[must_use]
    pub fn payments(&self) -> PgPaymentVerifier<'_> {
        PaymentVerifier::new(
            OrderRepository::new(self.pool()),
            self.paystack().clone(),
            self.config().paystack.timeout,
        )
    }

    /// Admin service bound to this state's pool.
    #[must_use]
    pub fn admin(&self) -> PgAdminService<'_> {
        AdminService::new(
            UserRepository::new(self.pool()),
            self.orders(),
            ProductRepository::new(self.pool()),
        )
    }
}
