//! Paystack API client for transaction verification.
//!
//! # API Reference
//!
//! - Base URL: `https://api.paystack.co`
//! - Authentication: secret key via `Authorization: Bearer <key>`
//! - Endpoint used: `GET /transaction/verify/{reference}`
//!
//! A payment counts as verified only when the envelope `status` is `true`
//! and the transaction `data.status` is `"success"`.

mod client;
mod types;

pub use client::PaystackClient;
pub use types::{TransactionData, VerifyResponse};

use thiserror::Error;

/// Errors that mean the gateway could not give a usable answer.
///
/// A reachable gateway that declines a transaction is not an error; it is
/// reported as an unsuccessful verification.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No answer within the configured timeout.
    #[error("gateway request timed out")]
    Timeout,

    /// Gateway answered with a status that carries no verdict (auth failure, 5xx).
    #[error("gateway returned HTTP {0}")]
    Status(u16),

    /// Response body could not be understood.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configured base URL is unusable.
    #[error("invalid gateway base URL: {0}")]
    InvalidBaseUrl(String),
}
