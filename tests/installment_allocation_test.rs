mod common;

use axum::http::{Method, StatusCode};
use common::{field_decimal, field_uuid, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn installment_numbers_are_sequential_from_one() {
    let app = TestApp::new().await;
    let order_id = app.create_order("10000").await;

    for expected_no in 1..=4 {
        let (status, body) = app.allocate(order_id, "1000").await;
        assert_eq!(status, StatusCode::CREATED, "body: {}", body);
        assert_eq!(body["installment_no"], json!(expected_no));
        assert_eq!(field_decimal(&body, "total_amount"), dec!(1000));
        assert!(body["transaction_number"]
            .as_str()
            .expect("transaction number")
            .starts_with("PT-"));
    }

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/purchase-orders/{}/installments", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let list = response_json(response).await;
    let numbers: Vec<i64> = list
        .as_array()
        .expect("installment array")
        .iter()
        .map(|i| i["installment_no"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn allocation_over_order_total_is_rejected_without_a_row() {
    let app = TestApp::new().await;
    let order_id = app.create_order("10000").await;

    let (status, _) = app.allocate(order_id, "9000").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.allocate(order_id, "2000").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("remaining balance"));

    // The rejected allocation must leave no trace.
    let installments = app
        .state
        .services
        .installments
        .list_for_order(order_id)
        .await
        .expect("list installments");
    assert_eq!(installments.len(), 1);

    // Exactly exhausting the remaining balance is allowed.
    let (status, body) = app.allocate(order_id, "1000").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["installment_no"], json!(2));

    let (status, _) = app.allocate(order_id, "0.01").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let app = TestApp::new().await;
    let order_id = app.create_order("10000").await;

    let (status, _) = app.allocate(order_id, "0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.allocate(order_id, "-50").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn allocation_for_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let (status, body) = app.allocate(Uuid::new_v4(), "100").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Not Found"));
}

#[tokio::test]
async fn concurrent_allocations_get_distinct_numbers() {
    let app = TestApp::new().await;
    let order_id = app.create_order("10000").await;
    let svc = app.state.services.installments.clone();

    let (a, b) = tokio::join!(
        svc.allocate(
            order_id,
            dec!(3000),
            ledgerline_api::entities::transaction::InstallmentStatus::Confirmed,
            None,
            None,
        ),
        svc.allocate(
            order_id,
            dec!(4000),
            ledgerline_api::entities::transaction::InstallmentStatus::Confirmed,
            None,
            None,
        ),
    );
    let a = a.expect("first allocation");
    let b = b.expect("second allocation");

    let mut numbers = vec![a.installment_no, b.installment_no];
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2]);
    assert_ne!(a.transaction_number, b.transaction_number);
}

#[tokio::test]
async fn cancelled_installments_keep_their_number_but_free_the_balance() {
    let app = TestApp::new().await;
    let order_id = app.create_order("1000").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/installments", order_id),
            Some(json!({ "amount": "800", "status": "cancelled" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The cancelled amount no longer counts toward the ceiling, but the
    // sequence moves past its number.
    let (status, body) = app.allocate(order_id, "900").await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(body["installment_no"], json!(2));
}

#[tokio::test]
async fn confirming_an_order_allocates_the_initial_installment() {
    let app = TestApp::new().await;
    let order_id = app.create_order("5000").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/confirm", order_id),
            Some(json!({ "initial_installment": "2500" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = response_json(response).await;
    assert_eq!(order["status"], json!("confirmed"));
    assert_eq!(field_uuid(&order, "id"), order_id);

    // The initial installment rides the event channel; poll briefly.
    let mut installments = Vec::new();
    for _ in 0..100 {
        installments = app
            .state
            .services
            .installments
            .list_for_order(order_id)
            .await
            .expect("list installments");
        if !installments.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(installments.len(), 1, "initial installment never arrived");
    assert_eq!(installments[0].installment_no, 1);
    assert_eq!(installments[0].total_amount, dec!(2500));

    // A second confirm attempt is rejected.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/confirm", order_id),
            Some(json!({})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn error_responses_carry_a_request_id_shape() {
    let app = TestApp::new().await;
    let (status, body) = app.allocate(Uuid::new_v4(), "100").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("message").is_some());
    assert!(body.get("timestamp").is_some());
    assert!(matches!(body.get("error"), Some(Value::String(_))));
    assert!(
        matches!(body.get("request_id"), Some(Value::String(_))),
        "request id middleware should stamp error payloads"
    );
}
