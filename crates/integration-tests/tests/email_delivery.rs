//! Confirmation email delivery through the `SendGrid` backend, against a
//! local stand-in for the API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;
use serde_json::Value;

use summit_core::Email;
use summit_integration_tests::{PUBLIC_BASE_URL, RegistrationFields, TestContext, serve};
use summit_server::config::SendGridConfig;
use summit_server::services::notifier::SendGridNotifier;

#[derive(Clone, Default)]
struct MockApi {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    status: Arc<Mutex<Option<StatusCode>>>,
}

async fn mail_send(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    api.requests.lock().unwrap().push((auth, body));
    api.status.lock().unwrap().unwrap_or(StatusCode::ACCEPTED)
}

async fn start_mock(status: Option<StatusCode>) -> (MockApi, String) {
    let api = MockApi::default();
    *api.status.lock().unwrap() = status;
    let app = Router::new()
        .route("/v3/mail/send", post(mail_send))
        .with_state(api.clone());
    let (addr, _handle) = serve(app).await;
    (api, format!("http://{addr}"))
}

fn notifier(api_base: String) -> SendGridNotifier {
    SendGridNotifier::new(
        &SendGridConfig {
            api_key: SecretString::from("SG.k3J9-xQ2mVb7Lp4T"),
            api_base,
        },
        Email::parse("summit@qaoncloud.com").unwrap(),
        "Summit Team",
    )
    .unwrap()
}

#[tokio::test]
async fn test_confirmation_sent_with_qr_attachment() {
    let (api, base) = start_mock(None).await;
    let ctx = TestContext::start(Arc::new(notifier(base))).await;

    let resp = ctx
        .register(&RegistrationFields::valid("E100", "asha@qaoncloud.com"))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let requests = api.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];

    assert_eq!(auth.as_deref(), Some("Bearer SG.k3J9-xQ2mVb7Lp4T"));
    assert_eq!(body["personalizations"][0]["to"][0]["email"], "asha@qaoncloud.com");
    assert_eq!(body["from"]["email"], "summit@qaoncloud.com");
    assert_eq!(body["subject"], "Registration Successful");

    let html = body["content"][1]["value"].as_str().unwrap();
    assert!(html.contains(&format!("{PUBLIC_BASE_URL}/verify/E100")));

    let attachment = &body["attachments"][0];
    assert_eq!(attachment["type"], "image/png");
    assert_eq!(attachment["disposition"], "attachment");
    let png = STANDARD
        .decode(attachment["content"].as_str().unwrap())
        .unwrap();
    assert!(png.starts_with(b"\x89PNG"));

    let stored = std::fs::read(ctx.qr_dir.join(&ctx.qr_files()[0])).unwrap();
    assert_eq!(png, stored);
}

#[tokio::test]
async fn test_rejected_delivery_still_registers() {
    let (api, base) = start_mock(Some(StatusCode::UNAUTHORIZED)).await;
    let ctx = TestContext::start(Arc::new(notifier(base))).await;

    let resp = ctx
        .register(&RegistrationFields::valid("E100", "asha@qaoncloud.com"))
        .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(ctx.count("registrations").await, 1);
    assert_eq!(api.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_mail_service_still_registers() {
    // Nothing listens on the discard port
    let ctx = TestContext::start(Arc::new(notifier("http://127.0.0.1:9".to_string()))).await;

    let resp = ctx
        .register(&RegistrationFields::valid("E100", "asha@qaoncloud.com"))
        .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(ctx.count("registrations").await, 1);
}
