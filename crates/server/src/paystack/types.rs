//! Paystack API types.

use serde::Deserialize;

/// Envelope returned by `GET /transaction/verify/{reference}`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    /// Whether the API call itself succeeded.
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<TransactionData>,
}

/// Transaction details inside a verify response.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionData {
    pub id: u64,
    pub reference: String,
    /// Transaction outcome: `success`, `failed`, `abandoned`, ...
    pub status: String,
    #[serde(default)]
    pub channel: Option<String>,
    /// Amount in the currency's subunit.
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub gateway_response: Option<String>,
}

impl VerifyResponse {
    /// `status == true && data.status == "success"`.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status && self.data.as_ref().is_some_and(|d| d.status == "success")
    }
}
