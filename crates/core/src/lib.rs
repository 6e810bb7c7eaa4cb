//! Shopdesk Core - Shared domain types.
//!
//! This crate provides the types shared by all Shopdesk components:
//! - `server` - Order, payment and admin HTTP service
//! - `cli` - Command-line tools for migrations and admin seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. The order status transition table lives here so
//! every component agrees on which status changes are legal.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, order statuses and caller roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
