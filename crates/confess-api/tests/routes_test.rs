use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use confess_api::state::{AppState, AppStateInner, Clock, Settings};
use confess_chain::{PaymentVerifier, PaymentVerifierConfig, TokenAmount};
use confess_db::Database;

const T: i64 = 1_700_000_000_000;
const HOUR: i64 = 60 * 60 * 1000;

fn test_state() -> AppState {
    let token = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913".parse().unwrap();
    let verifier = PaymentVerifier::new(PaymentVerifierConfig {
        rpc_url: None,
        token,
        request_timeout: Duration::from_secs(1),
    })
    .unwrap();

    AppState::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        verifier,
        settings: Settings {
            prompt_duration_hours: 24,
            free_prompts: 1,
            chain_id: 8453,
            token,
            treasury: "0x00000000000000000000000000000000deadbeef".parse().unwrap(),
            prompt_price: TokenAmount(1_000_000),
            reveal_price: TokenAmount(500_000),
        },
        clock: Clock::manual(T),
    })
}

fn tx(n: u64) -> String {
    format!("0x{:064x}", n)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn open_prompt(app: &Router, author: u64) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/prompts",
        Some(json!({ "content": "Never have I ever lied on a CV", "authorId": author })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn confess(app: &Router, prompt_id: &str, user: u64, kind: &str) -> StatusCode {
    send(
        app,
        Method::POST,
        "/api/confessions",
        Some(json!({ "promptId": prompt_id, "userId": user, "kind": kind })),
    )
    .await
    .0
}

#[tokio::test]
async fn free_allowance_then_paid_prompts() {
    let app = confess_api::router(test_state());

    let id = open_prompt(&app, 1).await;
    let (status, body) = send(&app, Method::GET, &format!("/api/prompts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "new");
    assert_eq!(body["authorId"], 1);
    assert_eq!(body["expiresAt"], T + 24 * HOUR);
    assert_eq!(body["totalConfessionCount"], 0);

    let req = json!({ "content": "Never have I ever paid twice", "authorId": 1 });
    let (status, body) = send(&app, Method::POST, "/api/prompts", Some(req)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("allowance"));

    let req = json!({
        "content": "Never have I ever paid twice",
        "authorId": 1,
        "transactionHash": tx(1),
    });
    let (status, _) = send(&app, Method::POST, "/api/prompts", Some(req.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    // Same transaction cannot pay for a second prompt.
    let (status, _) = send(&app, Method::POST, "/api/prompts", Some(req)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, "/api/prompts?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn paid_prompt_leaves_free_allowance_intact() {
    let app = confess_api::router(test_state());

    let req = json!({
        "content": "Never have I ever paid up front",
        "authorId": 4,
        "transactionHash": tx(2),
    });
    let (status, _) = send(&app, Method::POST, "/api/prompts", Some(req)).await;
    assert_eq!(status, StatusCode::CREATED);

    open_prompt(&app, 4).await;

    let req = json!({ "content": "Never have I ever stopped", "authorId": 4 });
    let (status, _) = send(&app, Method::POST, "/api/prompts", Some(req)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn prompt_validation_errors_are_json() {
    let app = confess_api::router(test_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/prompts",
        Some(json!({ "content": "   ", "authorId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "content is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/prompts",
        Some(json!({ "content": "Never have I ever" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "authorId is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/prompts",
        Some(json!({ "content": "x", "authorId": 1, "transactionHash": "0x12" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/prompts",
        Some(json!({
            "content": "x",
            "authorId": 1,
            "transactionHash": tx(3),
            "payerAddress": "not-a-wallet",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("address"));

    let (status, body) = send(&app, Method::GET, "/api/prompts/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn one_confession_per_user() {
    let app = confess_api::router(test_state());
    let id = open_prompt(&app, 1).await;

    assert_eq!(confess(&app, &id, 2, "have").await, StatusCode::CREATED);
    assert_eq!(confess(&app, &id, 3, "never").await, StatusCode::CREATED);
    assert_eq!(confess(&app, &id, 2, "never").await, StatusCode::CONFLICT);
    assert_eq!(confess(&app, "missing", 2, "have").await, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/confessions",
        Some(json!({ "promptId": id, "kind": "have" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId is required");

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}?viewerId=2"), None).await;
    assert_eq!(body["totalConfessionCount"], 2);
    assert_eq!(body["hasConfessed"], true);
    assert_eq!(body["revealState"], "activeUnpaid");
}

#[tokio::test]
async fn paid_reveal_survives_expiry_and_others_can_unlock() {
    let state = test_state();
    let app = confess_api::router(state.clone());
    let id = open_prompt(&app, 1).await;
    confess(&app, &id, 2, "have").await;
    confess(&app, &id, 3, "never").await;

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/reveal?userId=2"), None).await;
    assert_eq!(body["revealState"], "activeUnpaid");
    assert!(body.get("confessions").is_none());

    let pay = json!({ "userId": 2, "transactionHash": tx(10) });
    let (status, body) =
        send(&app, Method::POST, &format!("/api/prompts/{id}/payments"), Some(pay.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recorded"], true);
    assert_eq!(body["revealState"], "activePaid");

    // Paying again is a no-op.
    let (status, body) =
        send(&app, Method::POST, &format!("/api/prompts/{id}/payments"), Some(pay)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], false);

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/reveal?userId=2"), None).await;
    assert_eq!(body["revealState"], "activePaid");
    let revealed = body["confessions"].as_array().unwrap();
    assert_eq!(revealed.len(), 2);
    assert_eq!(revealed[0]["userId"], 2);
    assert_eq!(revealed[0]["kind"], "have");

    state.clock.advance(25 * HOUR);

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/reveal?userId=2"), None).await;
    assert_eq!(body["revealState"], "expiredPaid");
    assert!(body["confessions"].is_array());

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/reveal?userId=3"), None).await;
    assert_eq!(body["revealState"], "expiredOthersPaid");
    assert!(body.get("confessions").is_none());

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/payments?userId=3"), None).await;
    assert_eq!(body["hasUserPaid"], false);
    assert_eq!(body["hasAnyonePaid"], true);
    assert_eq!(body["payerCount"], 1);

    let pay = json!({ "userId": 3, "transactionHash": tx(11) });
    let (status, body) =
        send(&app, Method::POST, &format!("/api/prompts/{id}/payments"), Some(pay)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["revealState"], "expiredPaid");
}

#[tokio::test]
async fn expired_without_payers_is_burned() {
    let state = test_state();
    let app = confess_api::router(state.clone());
    let id = open_prompt(&app, 1).await;
    confess(&app, &id, 2, "have").await;

    state.clock.advance(24 * HOUR);

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/payments?userId=2"), None).await;
    assert_eq!(body["revealState"], "expiredNoPayers");

    let pay = json!({ "userId": 2, "transactionHash": tx(20) });
    let (status, body) =
        send(&app, Method::POST, &format!("/api/prompts/{id}/payments"), Some(pay)).await;
    assert_eq!(status, StatusCode::GONE);
    assert!(body["error"].is_string());

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/reveal?userId=2"), None).await;
    assert_eq!(body["revealState"], "expiredNoPayers");
    assert!(body.get("confessions").is_none());
}

#[tokio::test]
async fn status_follows_the_clock() {
    let state = test_state();
    let app = confess_api::router(state.clone());
    let id = open_prompt(&app, 1).await;

    let status_of = |body: &Value| body[0]["status"].as_str().unwrap().to_string();

    let (_, body) = send(&app, Method::GET, "/api/prompts", None).await;
    assert_eq!(status_of(&body), "new");

    state.clock.advance(3 * HOUR);
    let (_, body) = send(&app, Method::GET, "/api/prompts", None).await;
    assert_eq!(status_of(&body), "active");

    state.clock.advance(20 * HOUR);
    let (_, body) = send(&app, Method::GET, "/api/prompts", None).await;
    assert_eq!(status_of(&body), "expiring");
    assert_eq!(body[0]["timeRemaining"], HOUR);

    state.clock.advance(HOUR);
    let (_, body) = send(&app, Method::GET, "/api/prompts", None).await;
    assert_eq!(status_of(&body), "ended");
    assert_eq!(body[0]["timeRemaining"], 0);

    assert_eq!(confess(&app, &id, 2, "have").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_history() {
    let app = confess_api::router(test_state());
    let a = open_prompt(&app, 1).await;
    let b = open_prompt(&app, 2).await;
    confess(&app, &b, 1, "never").await;

    let pay = json!({ "userId": 1, "transactionHash": tx(30) });
    send(&app, Method::POST, &format!("/api/prompts/{b}/payments"), Some(pay)).await;

    let (status, body) = send(&app, Method::GET, "/api/users/1/interactions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompts"][0]["id"], a.as_str());
    assert_eq!(body["confessions"][0]["promptId"], b.as_str());
    assert!(body["confessions"][0].get("kind").is_none());

    let (_, body) = send(&app, Method::GET, "/api/users/1/payments", None).await;
    assert_eq!(body["payments"][0]["promptId"], b.as_str());
    assert_eq!(body["payments"][0]["transactionHash"], tx(30));

    let (status, body) = send(&app, Method::GET, "/api/users/abc/payments", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn user_history_never_exposes_answers() {
    let state = test_state();
    let app = confess_api::router(state.clone());
    let id = open_prompt(&app, 1).await;
    assert_eq!(confess(&app, &id, 2, "have").await, StatusCode::CREATED);

    state.clock.advance(25 * HOUR);

    let (_, body) = send(&app, Method::GET, &format!("/api/prompts/{id}/reveal?userId=9"), None).await;
    assert_eq!(body["revealState"], "expiredNoPayers");

    let (status, body) = send(&app, Method::GET, "/api/users/2/interactions", None).await;
    assert_eq!(status, StatusCode::OK);
    let answered = body["confessions"].as_array().unwrap();
    assert_eq!(answered.len(), 1);
    assert_eq!(answered[0]["promptId"], id.as_str());
    assert!(answered[0].get("kind").is_none());
    assert!(!body.to_string().contains("\"have\""));
}

#[tokio::test]
async fn payment_intent_is_typed_transfer() {
    let app = confess_api::router(test_state());

    let (status, body) = send(&app, Method::GET, "/api/payments/intent?purpose=reveal", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chainId"], 8453);
    assert_eq!(body["amount"], "500000");
    let data = body["data"].as_str().unwrap();
    assert!(data.starts_with("0xa9059cbb"));
    assert!(data.ends_with("7a120"));
    assert_eq!(data.len(), 2 + 68 * 2);

    let (status, _) = send(&app, Method::GET, "/api/payments/intent?purpose=tip", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
