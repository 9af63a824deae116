//! End-to-end tests for QR check-in, card issuance and the staff listings.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::LOCATION;

use summit_integration_tests::{RecordingNotifier, RegistrationFields, TestContext};

async fn registered(emp_ids: &[&str]) -> TestContext {
    let ctx = TestContext::start(Arc::new(RecordingNotifier::default())).await;
    for emp_id in emp_ids {
        let resp = ctx
            .register(&RegistrationFields::valid(
                emp_id,
                &format!("{}@qaoncloud.com", emp_id.to_lowercase().replace(' ', ".")),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }
    ctx
}

async fn verification_id(ctx: &TestContext, emp_id: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM verifications WHERE emp_id = ?")
        .bind(emp_id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_verify_unknown_attendee() {
    let ctx = registered(&[]).await;

    let resp = ctx.get("/verify/E404").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await.unwrap().contains("Invalid QR code"));
    assert_eq!(ctx.count("verifications").await, 0);
}

#[tokio::test]
async fn test_verify_is_idempotent() {
    let ctx = registered(&["E100"]).await;

    let first = ctx.get("/verify/E100").await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = first.text().await.unwrap();
    assert!(first.contains("Asha Rao"));
    assert!(first.contains("E100"));
    assert!(!first.contains("Already verified"));

    let second = ctx.get("/verify/E100").await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = second.text().await.unwrap();
    assert!(second.contains("Asha Rao"));
    assert!(second.contains("E100"));
    assert!(second.contains("Already verified"));

    assert_eq!(ctx.count("verifications").await, 1);
}

#[tokio::test]
async fn test_concurrent_scans_record_once() {
    let ctx = registered(&["E100"]).await;

    let mut scans = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let client = ctx.client.clone();
        let url = ctx.url("/verify/E100");
        scans.spawn(async move { client.get(url).send().await.unwrap().status() });
    }
    while let Some(status) = scans.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    assert_eq!(ctx.count("verifications").await, 1);
}

#[tokio::test]
async fn test_verify_percent_encoded_identifier() {
    let ctx = registered(&["QA 7"]).await;

    let resp = ctx.get("/verify/QA%207").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.count("verifications").await, 1);
}

#[tokio::test]
async fn test_issue_card() {
    let ctx = registered(&["E100"]).await;
    ctx.get("/verify/E100").await;
    let id = verification_id(&ctx, "E100").await;

    for _ in 0..2 {
        let resp = ctx.post(&format!("/issue_id/{id}")).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[LOCATION], "/verifications");
    }

    let issued: bool = sqlx::query_scalar("SELECT id_card_issued FROM verifications WHERE id = ?")
        .bind(id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert!(issued);

    let page = ctx.get("/verify/E100").await.text().await.unwrap();
    assert!(!page.contains(&format!("action=\"/issue_id/{id}\"")));
}

#[tokio::test]
async fn test_issue_card_unknown_verification() {
    let ctx = registered(&[]).await;

    let resp = ctx.post("/issue_id/999").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listings() {
    let ctx = registered(&["E100", "E200"]).await;
    ctx.get("/verify/E200").await;

    let registrations = ctx.get("/registrations").await;
    assert_eq!(registrations.status(), StatusCode::OK);
    let body = registrations.text().await.unwrap();
    assert!(body.contains("e100@qaoncloud.com"));
    assert!(body.contains("e200@qaoncloud.com"));
    assert!(body.find("E100") < body.find("E200"));
    assert!(body.contains("/static/qrcodes/"));

    let verifications = ctx.get("/verifications").await;
    assert_eq!(verifications.status(), StatusCode::OK);
    let body = verifications.text().await.unwrap();
    assert!(body.contains("E200"));
    assert!(!body.contains("E100"));
}

#[tokio::test]
async fn test_health_checks() {
    let ctx = registered(&[]).await;

    let resp = ctx.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    assert_eq!(ctx.get("/health/ready").await.status(), StatusCode::OK);

    let resp = ctx.get("/health").await;
    assert!(resp.headers().contains_key("x-request-id"));
}
