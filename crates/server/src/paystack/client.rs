//! HTTP client for the Paystack verify endpoint.

use std::future::Future;
use std::sync::Arc;

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, instrument, warn};

use super::{GatewayError, VerifyResponse};
use crate::config::PaystackConfig;
use crate::services::payments::{GatewayVerification, PaymentGateway};

/// Paystack API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct PaystackClient {
    inner: Arc<PaystackClientInner>,
}

struct PaystackClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl PaystackClient {
    /// Create a new Paystack client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client fails to build.
    pub fn new(config: &PaystackConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidBaseUrl(config.base_url.clone()));
        }

        let mut headers = HeaderMap::new();
        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.secret_key.expose_secret()))
                .map_err(|e| GatewayError::Parse(format!("Invalid secret key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(PaystackClientInner { client, base_url }),
        })
    }

    /// Build `{base}/transaction/verify/{reference}` with the reference
    /// percent-encoded as a single path segment.
    fn verify_url(&self, reference: &str) -> Result<Url, GatewayError> {
        build_verify_url(&self.inner.base_url, reference)
    }

    /// Call the verify endpoint and return the raw verdict.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` on timeouts, connection failures, auth
    /// failures, 5xx responses and unparseable bodies.
    #[instrument(skip(self), fields(reference = %reference))]
    pub async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<GatewayVerification, GatewayError> {
        let url = self.verify_url(reference)?;
        let response = self.inner.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::Http(e)
            }
        })?;

        debug!(status, "Paystack verify response received");
        interpret_response(status, &body, reference)
    }
}

impl PaymentGateway for PaystackClient {
    fn verify(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<GatewayVerification, GatewayError>> + Send {
        self.verify_transaction(reference)
    }
}

impl std::fmt::Debug for PaystackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn build_verify_url(base: &Url, reference: &str) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| GatewayError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["transaction", "verify", reference]);
    Ok(url)
}

/// Turn an HTTP status and body into a verdict.
///
/// 200 carries a verdict. 400 and 404 with a parseable body mean the gateway
/// is reachable and declined the reference. Everything else is unavailable.
fn interpret_response(
    status: u16,
    body: &str,
    requested_reference: &str,
) -> Result<GatewayVerification, GatewayError> {
    match status {
        200 => {
            let parsed: VerifyResponse = serde_json::from_str(body)
                .map_err(|e| GatewayError::Parse(format!("Failed to parse response: {e}")))?;
            Ok(to_verification(parsed, requested_reference))
        }
        400 | 404 => match serde_json::from_str::<VerifyResponse>(body) {
            Ok(parsed) => Ok(to_verification(parsed, requested_reference)),
            Err(_) => Err(GatewayError::Status(status)),
        },
        _ => {
            warn!(status, "Paystack returned an unusable status");
            Err(GatewayError::Status(status))
        }
    }
}

fn to_verification(response: VerifyResponse, requested_reference: &str) -> GatewayVerification {
    let success = response.is_successful();
    match response.data {
        Some(data) => GatewayVerification {
            success,
            id: data.id.to_string(),
            reference: data.reference,
            status: data.status,
            channel: data.channel.unwrap_or_default(),
            amount: data.amount,
            message: data.gateway_response.unwrap_or(response.message),
        },
        None => GatewayVerification {
            success: false,
            id: String::new(),
            reference: requested_reference.to_owned(),
            status: String::new(),
            channel: String::new(),
            amount: None,
            message: response.message,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config(base_url: &str) -> PaystackConfig {
        PaystackConfig {
            base_url: base_url.to_owned(),
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_verify_url_encodes_reference() {
        let base = Url::parse("https://api.paystack.co").unwrap();
        assert_eq!(
            build_verify_url(&base, "ref123").unwrap().as_str(),
            "https://api.paystack.co/transaction/verify/ref123"
        );
        assert_eq!(
            build_verify_url(&base, "a/b c").unwrap().as_str(),
            "https://api.paystack.co/transaction/verify/a%2Fb%20c"
        );
    }

    #[test]
    fn test_verify_url_keeps_base_path() {
        let base = Url::parse("http://localhost:4010/mock/").unwrap();
        assert_eq!(
            build_verify_url(&base, "ref123").unwrap().as_str(),
            "http://localhost:4010/mock/transaction/verify/ref123"
        );
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let err = PaystackClient::new(&config("not a url")).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let client = PaystackClient::new(&config("https://api.paystack.co")).unwrap();
        let debug_output = format!("{client:?}");
        assert!(debug_output.contains("api.paystack.co"));
        assert!(!debug_output.contains("sk_test"));
    }

    #[test]
    fn test_interpret_success() {
        let body = r#"{"status": true, "message": "Verification successful",
            "data": {"id": 4099260516, "status": "success", "reference": "ref123",
                     "channel": "card", "amount": 2000, "gateway_response": "Approved"}}"#;
        let verdict = interpret_response(200, body, "ref123").unwrap();
        assert!(verdict.success);
        assert_eq!(verdict.id, "4099260516");
        assert_eq!(verdict.reference, "ref123");
        assert_eq!(verdict.channel, "card");
        assert_eq!(verdict.amount, Some(2000));
        assert_eq!(verdict.message, "Approved");
    }

    #[test]
    fn test_interpret_declined_on_400() {
        let body = r#"{"status": false, "message": "Transaction reference not found"}"#;
        let verdict = interpret_response(400, body, "nope").unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.reference, "nope");
        assert_eq!(verdict.message, "Transaction reference not found");
    }

    #[test]
    fn test_interpret_failed_transaction() {
        let body = r#"{"status": true, "message": "Verification successful",
            "data": {"id": 7, "status": "failed", "reference": "ref7", "channel": "bank"}}"#;
        let verdict = interpret_response(200, body, "ref7").unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.status, "failed");
    }

    #[test]
    fn test_interpret_unavailable_statuses() {
        assert!(matches!(
            interpret_response(401, r#"{"status": false, "message": "Invalid key"}"#, "r"),
            Err(GatewayError::Status(401))
        ));
        assert!(matches!(
            interpret_response(503, "<html>down</html>", "r"),
            Err(GatewayError::Status(503))
        ));
        assert!(matches!(
            interpret_response(404, "<html>not found</html>", "r"),
            Err(GatewayError::Status(404))
        ));
        assert!(matches!(
            interpret_response(200, "not json", "r"),
            Err(GatewayError::Parse(_))
        ));
    }
}
