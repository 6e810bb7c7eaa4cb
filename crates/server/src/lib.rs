//! Shopdesk server library.
//!
//! Order lifecycle, Paystack payment verification and the access-gated
//! admin API, exposed as a library so the binary, the CLI and the
//! integration tests share one implementation.
//!
//! # Layers
//!
//! - [`routes`] - Axum handlers, thin translation to and from JSON
//! - [`services`] - Business rules, generic over stores and the gateway
//! - [`db`] - `PostgreSQL` repositories (and in-memory stores for tests)
//! - [`paystack`] - Payment gateway client

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod paystack;
pub mod routes;
pub mod services;
pub mod state;
