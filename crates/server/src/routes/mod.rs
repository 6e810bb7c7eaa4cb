//! HTTP routes for Shopdesk.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness check
//! GET    /health/ready                   - Readiness check (database)
//!
//! # Orders
//! POST   /api/orders                     - Place an order (Idempotency-Key header)
//! GET    /api/orders?customerEmail=...   - Orders for one customer
//! GET    /api/orders/{id}                - Order detail
//!
//! # Payments
//! POST   /api/payments/verify            - Verify a Paystack payment for an order
//!
//! # Admin (x-user-id must name an admin)
//! GET    /api/admin/users                - List users
//! DELETE /api/admin/users/{id}           - Delete a non-admin user
//! PUT    /api/admin/users/{id}/role      - Grant or revoke admin
//! GET    /api/admin/orders               - List all orders
//! PUT    /api/admin/orders/{id}          - Update order status
//! DELETE /api/admin/orders/{id}          - Delete an order
//! GET    /api/admin/products             - List products
//! POST   /api/admin/products             - Create a product
//! PUT    /api/admin/products/{id}        - Update a product
//! DELETE /api/admin/products/{id}        - Delete a product
//! ```

use axum::{Router, middleware as axum_middleware};

use crate::error::AppError;
use crate::middleware::require_admin;
use crate::state::AppState;

pub mod admin;
pub mod health;
pub mod orders;
pub mod payments;

/// Build the application router.
///
/// The admin guard needs the state to resolve callers, so the router is
/// built around a concrete state rather than left generic.
pub fn router(state: AppState) -> Router {
    let admin = admin::router().route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        require_admin,
    ));

    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(admin)
        .with_state(state)
}

/// Parse a path segment into a typed ID.
///
/// Axum's own `Path` rejection is plain text; this keeps malformed IDs on the
/// JSON error contract.
pub(crate) fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| AppError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{PaystackConfig, ServerConfig};

    fn test_state() -> AppState {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://shopdesk@localhost/shopdesk_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            paystack: PaystackConfig {
                base_url: "http://127.0.0.1:9".to_owned(),
                secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
                timeout: Duration::from_secs(1),
            },
            strict_order_totals: false,
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            tls: None,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://shopdesk@127.0.0.1:9/shopdesk_test")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(test_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_route_without_identity_is_forbidden() {
        let request = Request::get("/api/admin/users").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errorKind"], "Forbidden");
    }

    #[tokio::test]
    async fn test_admin_route_with_malformed_identity_is_forbidden() {
        let request = Request::delete("/api/admin/orders/1")
            .header("x-user-id", "not-a-number")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errorKind"], "Forbidden");
    }

    #[tokio::test]
    async fn test_malformed_order_body_is_invalid_request() {
        let (status, body) = send(post_json("/api/orders", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKind"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_order_without_items_is_invalid_request() {
        let draft = r#"{"customer": {"name": "Ada", "email": "ada@shop.test"},
            "items": [], "total": "0"}"#;
        let (status, body) = send(post_json("/api/orders", draft)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKind"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_verify_without_reference_is_invalid_request() {
        let (status, body) =
            send(post_json("/api/payments/verify", r#"{"orderId": 1, "reference": "  "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKind"], "InvalidRequest");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .ends_with("Missing reference or order ID")
        );
    }

    #[tokio::test]
    async fn test_malformed_order_id_is_invalid_request() {
        let request = Request::get("/api/orders/abc").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKind"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_customer_listing_requires_email() {
        let (status, body) = send(Request::get("/api/orders").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKind"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_invalid_request() {
        let uri = "/api/orders?customerEmail=a%40shop.test&customerEmail=b%40shop.test";
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKind"], "InvalidRequest");
        assert!(body["message"].as_str().unwrap().starts_with("Invalid request: "));
    }
}
