use axum::{Json, extract::State, response::IntoResponse};

use confess_types::api::{ConfessionSummary, UserInteractionsResponse, UserPaymentsResponse};
use confess_types::models::UserId;

use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::prompts::prompt_response;
use crate::state::{AppState, run_db};

fn require_user(id: UserId) -> Result<UserId, ApiError> {
    if id == 0 {
        return Err(ApiError::NotFound("user 0 does not exist".into()));
    }
    Ok(id)
}

/// GET /api/users/{id}/interactions — prompts authored and prompts answered.
pub async fn interactions(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(user_id)?;

    let (prompts, confessions) = run_db(&state, move |db| {
        let ids = db.list_user_prompt_ids(user_id)?;
        Ok((db.get_prompts(&ids)?, db.list_user_confessions(user_id)?))
    })
    .await?;

    let now = state.clock.now_millis();
    let mut prompts: Vec<_> = prompts.into_iter().map(|p| prompt_response(p, now)).collect();
    prompts.sort_by(|a, b| b.prompt.created_at.cmp(&a.prompt.created_at));

    Ok(Json(UserInteractionsResponse {
        user_id,
        prompts,
        confessions: confessions.iter().map(ConfessionSummary::from).collect(),
    }))
}

/// GET /api/users/{id}/payments
pub async fn payments(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(user_id)?;
    let payments = run_db(&state, move |db| db.list_user_payments(user_id)).await?;
    Ok(Json(UserPaymentsResponse { user_id, payments }))
}
