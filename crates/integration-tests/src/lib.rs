//! Integration test fixtures for Shopdesk.
//!
//! The service-level suites run the real services over the in-memory stores,
//! with [`StubGateway`] standing in for Paystack. The HTTP suite talks to a
//! running server and is ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Service-level suites (no external services)
//! cargo test -p shopdesk-integration-tests
//!
//! # HTTP smoke tests against a running server
//! SHOPDESK_BASE_URL=http://localhost:5000 cargo test -p shopdesk-integration-tests -- --ignored
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;

use shopdesk_core::{Email, ProductId};
use shopdesk_server::db::UserStore;
use shopdesk_server::db::memory::{MemoryOrderStore, MemoryProductStore, MemoryUserStore};
use shopdesk_server::models::{CustomerSnapshot, NewUser, OrderItem, User};
use shopdesk_server::paystack::GatewayError;
use shopdesk_server::services::{
    AdminService, GatewayVerification, OrderDraft, OrderLifecycle, PaymentGateway,
    PaymentVerifier,
};

/// Gateway double that approves a fixed set of references.
///
/// Unknown references are declined. Clones share the call counter.
#[derive(Clone, Default)]
pub struct StubGateway {
    approved: Arc<HashSet<String>>,
    unavailable: bool,
    calls: Arc<AtomicUsize>,
}

impl StubGateway {
    /// Approve exactly these references.
    #[must_use]
    pub fn approving<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            approved: Arc::new(references.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// A gateway that answers every call with a 503.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of verify calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for StubGateway {
    fn verify(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<GatewayVerification, GatewayError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.unavailable {
            Err(GatewayError::Status(503))
        } else {
            let success = self.approved.contains(reference);
            Ok(GatewayVerification {
                success,
                id: "4099260516".to_owned(),
                reference: reference.to_owned(),
                status: if success { "success" } else { "abandoned" }.to_owned(),
                channel: "card".to_owned(),
                amount: None,
                message: "Verification successful".to_owned(),
            })
        };
        std::future::ready(result)
    }
}

/// The memory-backed service set used by the scenario suites.
#[derive(Clone, Default)]
pub struct TestShop {
    pub users: MemoryUserStore,
    pub orders: MemoryOrderStore,
    pub products: MemoryProductStore,
}

impl TestShop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Order lifecycle with lenient totals.
    #[must_use]
    pub fn lifecycle(&self) -> OrderLifecycle<MemoryOrderStore> {
        OrderLifecycle::new(self.orders.clone(), false)
    }

    /// Payment verifier over this shop's orders.
    #[must_use]
    pub fn verifier<G: PaymentGateway>(&self, gateway: G) -> PaymentVerifier<MemoryOrderStore, G> {
        PaymentVerifier::new(self.orders.clone(), gateway, Duration::from_secs(5))
    }

    /// Admin service over this shop's stores.
    #[must_use]
    pub fn admin(&self) -> AdminService<MemoryUserStore, MemoryOrderStore, MemoryProductStore> {
        AdminService::new(self.users.clone(), self.lifecycle(), self.products.clone())
    }

    /// Insert a user directly into the store.
    pub async fn seed_user(&self, name: &str, email: &str, is_admin: bool) -> User {
        self.users
            .create(NewUser {
                name: name.to_owned(),
                email: Email::parse(email).expect("valid fixture email"),
                password_hash: "$argon2id$fixture".to_owned(),
                is_admin,
            })
            .await
            .expect("seed user")
    }
}

/// A one-line draft for `quantity` widgets at `price` each.
#[must_use]
pub fn widget_draft(quantity: i32, price: Decimal, total: Decimal) -> OrderDraft {
    OrderDraft {
        customer: CustomerSnapshot {
            name: "Ada Lovelace".to_owned(),
            email: Email::parse("ada@shop.test").expect("valid fixture email"),
        },
        items: vec![OrderItem {
            product_id: ProductId::new(1),
            name: "Widget".to_owned(),
            image: "/images/widget.jpg".to_owned(),
            price,
            quantity,
        }],
        total,
    }
}
