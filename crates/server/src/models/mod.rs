//! Domain models for Shopdesk.
//!
//! These are validated domain objects; database row types live next to the
//! repositories in [`crate::db`] and convert into these via `TryFrom`.

pub mod money;
pub mod order;
pub mod product;
pub mod user;

pub use money::{AmountError, MONEY_LIMIT, MONEY_SCALE, check_amount};
pub use order::{
    CustomerSnapshot, NewOrder, Order, OrderItem, PaymentResult, PlacedOrder, items_total,
};
pub use product::{NewProduct, Product, ProductPatch};
pub use user::{NewUser, PublicUser, User};
