//! Routing rules: skipped phases, cancellation, closed sales, bad requests.

use axum::http::{Method, StatusCode, header};

use convention_integration_tests::{HOMEPAGE, TestShop, phase_path};

#[tokio::test]
async fn test_cannot_skip_ahead() {
    let shop = TestShop::new().await;
    let mut client = shop.client();

    for slug in ["tickets", "address", "confirm", "thanks"] {
        let response = client.get(&phase_path(slug)).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{slug}");
        assert_eq!(response.location(), phase_path("welcome"), "{slug}");
    }
    assert_eq!(shop.store.order_count().await, 0);
}

#[tokio::test]
async fn test_cancel_deletes_order() {
    let shop = TestShop::new().await;
    let mut client = shop.client();

    client.post(&phase_path("welcome"), &[("action", "next")]).await;
    assert_eq!(shop.store.order_count().await, 1);

    let response = client.post(&phase_path("tickets"), &[("action", "cancel")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), HOMEPAGE);
    assert_eq!(shop.store.order_count().await, 0);

    let tickets = client.get(&phase_path("tickets")).await;
    assert_eq!(tickets.location(), phase_path("welcome"));
}

#[tokio::test]
async fn test_unknown_action_is_rejected() {
    let shop = TestShop::new().await;
    let mut client = shop.client();

    let response = client
        .post(&phase_path("welcome"), &[("action", "refund")])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(shop.store.order_count().await, 0);
}

#[tokio::test]
async fn test_other_methods_get_405() {
    let shop = TestShop::new().await;
    let mut client = shop.client();

    let response = client.send(Method::DELETE, &phase_path("welcome"), None).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers[header::ALLOW], "GET, POST");
}

#[tokio::test]
async fn test_unknown_event_and_phase() {
    let shop = TestShop::new().await;
    let mut client = shop.client();

    let event = client.get("/events/nosuchcon/tickets/welcome").await;
    assert_eq!(event.status, StatusCode::NOT_FOUND);

    let phase = client.get(&phase_path("checkout")).await;
    assert_eq!(phase.status, StatusCode::NOT_FOUND);

    let closed = client.get(&phase_path("closed")).await;
    assert_eq!(closed.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_closed_sales_replace_every_phase() {
    let shop = TestShop::with_sales_open(false).await;
    let mut client = shop.client();

    for slug in ["welcome", "tickets", "confirm", "thanks"] {
        let response = client.get(&phase_path(slug)).await;
        assert_eq!(response.status, StatusCode::OK, "{slug}");
        assert!(response.body.contains("Ticket sales are not open"), "{slug}");
    }

    let next = client.post(&phase_path("tickets"), &[("action", "next")]).await;
    assert_eq!(next.status, StatusCode::SEE_OTHER);
    assert_eq!(next.location(), HOMEPAGE);
    assert_eq!(shop.store.order_count().await, 0);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let shop = TestShop::new().await;
    let mut client = shop.client();

    let health = client.get("/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body, "ok");
    assert!(health.headers.contains_key("x-request-id"));

    let ready = client.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}
