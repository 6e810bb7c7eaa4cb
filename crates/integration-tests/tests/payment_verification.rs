//! Payment verification scenarios.
//!
//! Most tests use [`StubGateway`]. The last group drives the real
//! `PaystackClient` against a local mock of the verify endpoint.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::get,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};

use shopdesk_core::{OrderId, OrderStatus};
use shopdesk_integration_tests::{StubGateway, TestShop, widget_draft};
use shopdesk_server::config::PaystackConfig;
use shopdesk_server::error::ErrorKind;
use shopdesk_server::models::Order;
use shopdesk_server::paystack::PaystackClient;
use shopdesk_server::services::{Caller, OrderUpdate, PaymentVerifier};

const TEST_SECRET: &str = "sk_test_4eC39HqLyjWDarjtT1zdp7dc";

async fn widget_order(shop: &TestShop) -> Order {
    shop.lifecycle()
        .place_order(widget_draft(2, Decimal::from(10), Decimal::from(20)), None)
        .await
        .unwrap()
        .order
}

#[tokio::test]
async fn test_checkout_then_verify_marks_order_paid() {
    let shop = TestShop::new();
    let order = widget_order(&shop).await;
    assert_eq!(order.total, Decimal::from(20));
    assert!(!order.is_paid);

    let gateway = StubGateway::approving(["ref123"]);
    let outcome = shop
        .verifier(gateway.clone())
        .verify(Some(order.id), "ref123")
        .await
        .unwrap();

    assert!(outcome.newly_recorded);
    let paid = outcome.order;
    assert!(paid.is_paid);
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(paid.paid_at.is_some());
    let receipt = paid.payment_result.as_ref().unwrap();
    assert_eq!(receipt.reference, "ref123");
    assert_eq!(receipt.status, "success");
    assert_eq!(receipt.channel, "card");
    assert_eq!(gateway.calls(), 1);

    let stored = shop.lifecycle().get_order(order.id).await.unwrap();
    assert_eq!(stored, paid);
}

#[tokio::test]
async fn test_verifying_twice_keeps_the_first_payment() {
    let shop = TestShop::new();
    let order = widget_order(&shop).await;
    let verifier = shop.verifier(StubGateway::approving(["ref123"]));

    let first = verifier.verify(Some(order.id), "ref123").await.unwrap();
    let second = verifier.verify(Some(order.id), "ref123").await.unwrap();

    assert!(first.newly_recorded);
    assert!(!second.newly_recorded);
    assert_eq!(second.order.paid_at, first.order.paid_at);
    assert_eq!(second.order.version, first.order.version);
}

#[tokio::test]
async fn test_declined_reference_leaves_order_unpaid() {
    let shop = TestShop::new();
    let order = widget_order(&shop).await;

    let err = shop
        .verifier(StubGateway::approving(["ref123"]))
        .verify(Some(order.id), "forged-ref")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentNotVerified);
    assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);

    let stored = shop.lifecycle().get_order(order.id).await.unwrap();
    assert!(!stored.is_paid);
    assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_gateway_outage_is_distinct_from_decline() {
    let shop = TestShop::new();
    let order = widget_order(&shop).await;

    let err = shop
        .verifier(StubGateway::unavailable())
        .verify(Some(order.id), "ref123")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GatewayUnavailable);
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

    let stored = shop.lifecycle().get_order(order.id).await.unwrap();
    assert!(!stored.is_paid);
}

#[tokio::test]
async fn test_missing_inputs_never_reach_the_gateway() {
    let shop = TestShop::new();
    let order = widget_order(&shop).await;
    let gateway = StubGateway::approving(["ref123"]);
    let verifier = shop.verifier(gateway.clone());

    for (id, reference) in [(None, "ref123"), (Some(order.id), ""), (Some(order.id), "   ")] {
        let err = verifier.verify(id, reference).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().ends_with("Missing reference or order ID"));
    }
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let shop = TestShop::new();
    let err = shop
        .verifier(StubGateway::approving(["ref123"]))
        .verify(Some(OrderId::new(404)), "ref123")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_second_reference_on_paid_order_conflicts() {
    let shop = TestShop::new();
    let order = widget_order(&shop).await;
    let verifier = shop.verifier(StubGateway::approving(["ref123", "ref456"]));

    verifier.verify(Some(order.id), "ref123").await.unwrap();
    let err = verifier.verify(Some(order.id), "ref456").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = shop.lifecycle().get_order(order.id).await.unwrap();
    assert_eq!(stored.payment_reference(), Some("ref123"));
}

#[tokio::test]
async fn test_cancelled_order_cannot_be_paid() {
    let shop = TestShop::new();
    let admin = Caller::from(&shop.seed_user("Admin", "admin@shop.test", true).await);
    let order = widget_order(&shop).await;
    shop.admin()
        .update_order(
            Some(&admin),
            order.id,
            OrderUpdate {
                status: Some(OrderStatus::Cancelled),
            },
        )
        .await
        .unwrap();

    let err = shop
        .verifier(StubGateway::approving(["ref123"]))
        .verify(Some(order.id), "ref123")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = shop.lifecycle().get_order(order.id).await.unwrap();
    assert!(!stored.is_paid);
    assert_eq!(stored.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_paid_order_can_ship_after_verification() {
    let shop = TestShop::new();
    let admin = Caller::from(&shop.seed_user("Admin", "admin@shop.test", true).await);
    let order = widget_order(&shop).await;
    shop.verifier(StubGateway::approving(["ref123"]))
        .verify(Some(order.id), "ref123")
        .await
        .unwrap();

    let shipped = shop
        .admin()
        .update_order(
            Some(&admin),
            order.id,
            OrderUpdate {
                status: Some(OrderStatus::Shipped),
            },
        )
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(shipped.is_paid);
    assert_eq!(shipped.payment_reference(), Some("ref123"));
}

// ============================================================================
// Real Paystack client against a local mock
// ============================================================================

async fn mock_verify(
    headers: HeaderMap,
    Path(reference): Path<String>,
) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TEST_SECRET}"));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": false, "message": "Invalid key"})),
        );
    }

    match reference.as_str() {
        "ref123" => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "message": "Verification successful",
                "data": {
                    "id": 4_099_260_516_u64,
                    "status": "success",
                    "reference": "ref123",
                    "channel": "card",
                    "amount": 2000,
                    "gateway_response": "Successful"
                }
            })),
        ),
        "abandoned" => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "message": "Verification successful",
                "data": {
                    "id": 7,
                    "status": "abandoned",
                    "reference": "abandoned",
                    "channel": "card"
                }
            })),
        ),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, Json(json!({"status": false, "message": "late"})))
        }
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": false, "message": "upstream error"})),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": false, "message": "Transaction reference not found"})),
        ),
    }
}

async fn spawn_mock_paystack() -> SocketAddr {
    let app = Router::new().route("/transaction/verify/{reference}", get(mock_verify));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn paystack(addr: SocketAddr, secret: &str, timeout: Duration) -> PaystackClient {
    PaystackClient::new(&PaystackConfig {
        base_url: format!("http://{addr}"),
        secret_key: SecretString::from(secret),
        timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn test_paystack_client_end_to_end() {
    let addr = spawn_mock_paystack().await;
    let shop = TestShop::new();
    let order = widget_order(&shop).await;
    let verifier = PaymentVerifier::new(
        shop.orders.clone(),
        paystack(addr, TEST_SECRET, Duration::from_secs(2)),
        Duration::from_secs(2),
    );

    let outcome = verifier.verify(Some(order.id), "ref123").await.unwrap();
    assert!(outcome.order.is_paid);
    let receipt = outcome.order.payment_result.unwrap();
    assert_eq!(receipt.id, "4099260516");
    assert_eq!(receipt.channel, "card");
}

#[tokio::test]
async fn test_paystack_declines_map_to_not_verified() {
    let addr = spawn_mock_paystack().await;
    let shop = TestShop::new();
    let order = widget_order(&shop).await;
    let verifier = PaymentVerifier::new(
        shop.orders.clone(),
        paystack(addr, TEST_SECRET, Duration::from_secs(2)),
        Duration::from_secs(2),
    );

    for reference in ["abandoned", "unknown-ref"] {
        let err = verifier.verify(Some(order.id), reference).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentNotVerified, "{reference}");
    }
}

#[tokio::test]
async fn test_paystack_failures_map_to_gateway_unavailable() {
    let addr = spawn_mock_paystack().await;
    let shop = TestShop::new();
    let order = widget_order(&shop).await;

    let bad_key = PaymentVerifier::new(
        shop.orders.clone(),
        paystack(addr, "sk_test_9xQ2mR7vL4pW8nK3jH6tY1cZ", Duration::from_secs(2)),
        Duration::from_secs(2),
    );
    let err = bad_key.verify(Some(order.id), "ref123").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GatewayUnavailable);

    let verifier = PaymentVerifier::new(
        shop.orders.clone(),
        paystack(addr, TEST_SECRET, Duration::from_millis(200)),
        Duration::from_secs(2),
    );
    let err = verifier.verify(Some(order.id), "broken").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GatewayUnavailable);

    let err = verifier.verify(Some(order.id), "slow").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GatewayUnavailable);
    assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);

    let stored = shop.lifecycle().get_order(order.id).await.unwrap();
    assert!(!stored.is_paid);
}
