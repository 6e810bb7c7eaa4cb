//! Business logic services for Shopdesk.
//!
//! # Services
//!
//! - `access` - Caller identity and the central role guard
//! - `orders` - Order lifecycle: placement, lookups and guarded status changes
//! - `payments` - Gateway verification reconciled into order payment state
//! - `admin` - Access-gated user, order and product administration
//!
//! Services are generic over the store traits in [`crate::db`] and the
//! [`PaymentGateway`] trait, so the same logic runs against `PostgreSQL`
//! and Paystack in production and against in-memory fakes in tests.

pub mod access;
pub mod admin;
pub mod orders;
pub mod payments;

pub use access::{Caller, authorize};
pub use admin::{AdminService, OrderUpdate};
pub use orders::{OrderDraft, OrderLifecycle};
pub use payments::{GatewayVerification, PaymentGateway, PaymentVerifier, VerificationOutcome};
