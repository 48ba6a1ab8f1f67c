pub mod confessions;
pub mod error;
pub mod extract;
pub mod payments;
pub mod prompts;
pub mod state;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// All API routes. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/prompts", get(prompts::list_prompts).post(prompts::create_prompt))
        .route("/api/prompts/{id}", get(prompts::get_prompt))
        .route(
            "/api/prompts/{id}/payments",
            get(payments::payment_status).post(payments::record_payment),
        )
        .route("/api/prompts/{id}/reveal", get(confessions::reveal))
        .route("/api/confessions", post(confessions::create_confession))
        .route("/api/users/{id}/interactions", get(users::interactions))
        .route("/api/users/{id}/payments", get(users::payments))
        .route("/api/payments/intent", get(payments::payment_intent))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
