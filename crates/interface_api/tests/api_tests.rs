//! HTTP API tests against an in-memory billing store

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use interface_api::{config::ApiConfig, create_router};
use test_utils::{InMemoryBillingStore, TestCreditAccountBuilder, TestInvoiceBuilder};

async fn server_with(store: InMemoryBillingStore) -> TestServer {
    let app = create_router(Arc::new(store), ApiConfig::default());
    TestServer::new(app).expect("failed to start test server")
}

#[tokio::test]
async fn health_endpoints_respond() {
    let server = server_with(InMemoryBillingStore::new()).await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");

    let response = server.get("/health/ready").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn reconcile_settles_invoice_over_http() {
    let invoice = TestInvoiceBuilder::new()
        .flight_charge("C152 solo - 1.2 hr", dec!(215.00), dec!(1.2))
        .additional_charge("Landing fee", dec!(41.00))
        .build();
    let store = InMemoryBillingStore::new();
    store.seed_invoice(invoice.clone()).await;
    store
        .seed_credit_account(
            TestCreditAccountBuilder::for_member(invoice.member_id)
                .balance(dec!(100.00))
                .build(),
        )
        .await;
    let server = server_with(store).await;

    let response = server
        .post(&format!("/api/v1/invoices/{}/reconcile", invoice.id.as_uuid()))
        .json(&json!({
            "member_id": invoice.member_id.as_uuid(),
            "credit_to_apply": "100.00",
            "remainder": {
                "method": "eftpos",
                "amount": "199.00"
            },
            "recorded_by": Uuid::new_v4()
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["invoice_status"], "paid");
    assert_eq!(body["payments"].as_array().unwrap().len(), 2);
    assert_eq!(body["payments"][0]["method"], "credit");
    assert_eq!(body["payments"][1]["method"], "eftpos");

    // Receipt numbers come back formatted.
    let receipt = body["payments"][0]["receipt_number"].as_str().unwrap();
    assert!(receipt.starts_with("RCT-"));

    // The invoice read model reflects settlement.
    let response = server
        .get(&format!("/api/v1/invoices/{}", invoice.id.as_uuid()))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "paid");
    assert_eq!(body["remaining_balance"], "0.00");
}

#[tokio::test]
async fn missing_remainder_method_is_unprocessable() {
    let invoice = TestInvoiceBuilder::new().total(dec!(200.00)).build();
    let store = InMemoryBillingStore::new();
    store.seed_invoice(invoice.clone()).await;
    store
        .seed_credit_account(
            TestCreditAccountBuilder::for_member(invoice.member_id)
                .balance(dec!(50.00))
                .build(),
        )
        .await;
    let server = server_with(store).await;

    let response = server
        .post(&format!("/api/v1/invoices/{}/reconcile", invoice.id.as_uuid()))
        .json(&json!({
            "member_id": invoice.member_id.as_uuid(),
            "credit_to_apply": "50.00",
            "recorded_by": Uuid::new_v4()
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn unknown_invoice_is_not_found() {
    let server = server_with(InMemoryBillingStore::new()).await;

    let response = server
        .post(&format!("/api/v1/invoices/{}/reconcile", Uuid::new_v4()))
        .json(&json!({
            "member_id": Uuid::new_v4(),
            "credit_to_apply": "0",
            "remainder": { "method": "cash", "amount": "10.00" },
            "recorded_by": Uuid::new_v4()
        }))
        .await;

    response.assert_status_not_found();

    let response = server.get(&format!("/api/v1/invoices/{}", Uuid::new_v4())).await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn credit_account_endpoint_reads_balance() {
    let member_id = core_kernel::MemberId::new();
    let store = InMemoryBillingStore::new();
    store
        .seed_credit_account(
            TestCreditAccountBuilder::for_member(member_id)
                .balance(dec!(75.50))
                .build(),
        )
        .await;
    let server = server_with(store).await;

    let response = server
        .get(&format!("/api/v1/members/{}/credit", member_id.as_uuid()))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["balance"], "75.50");
    assert_eq!(body["currency"], "NZD");

    let response = server
        .get(&format!("/api/v1/members/{}/credit", Uuid::new_v4()))
        .await;
    response.assert_status_not_found();
}
