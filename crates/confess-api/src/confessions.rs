use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use confess_types::api::{CreateConfessionRequest, RevealResponse};
use confess_types::lifecycle::{self, reveal_state};
use confess_types::models::{Confession, UserId};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::prompts::load_prompt;
use crate::state::{AppState, run_db};

pub const MAX_CAPTION_LEN: usize = 280;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealQuery {
    pub user_id: Option<UserId>,
}

pub async fn create_confession(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateConfessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = match req.user_id {
        Some(id) if id != 0 => id,
        _ => return Err(ApiError::Validation("userId is required".into())),
    };
    if req.prompt_id.trim().is_empty() {
        return Err(ApiError::Validation("promptId is required".into()));
    }

    let caption = req
        .caption
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if caption.as_ref().is_some_and(|c| c.chars().count() > MAX_CAPTION_LEN) {
        return Err(ApiError::Validation(format!(
            "caption is longer than {} characters",
            MAX_CAPTION_LEN
        )));
    }
    let image_url = req.image_url.filter(|u| !u.is_empty());
    if image_url.as_ref().is_some_and(|u| !u.starts_with("https://")) {
        return Err(ApiError::Validation("imageUrl must be an https URL".into()));
    }

    let prompt = load_prompt(&state, &req.prompt_id).await?;
    let now = state.clock.now_millis();
    if lifecycle::is_expired(now, prompt.expires_at) {
        return Err(ApiError::Validation("prompt has ended".into()));
    }

    let confession = Confession {
        prompt_id: prompt.id,
        user_id,
        kind: req.kind,
        image_url,
        caption,
        timestamp: now,
    };

    let stored = confession.clone();
    let added = run_db(&state, move |db| db.add_confession(&stored)).await?;
    if !added {
        return Err(ApiError::Conflict("already answered this prompt".into()));
    }

    Ok((StatusCode::CREATED, Json(confession)))
}

/// GET /api/prompts/{id}/reveal — answers with names attached, only for payers.
pub async fn reveal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<RevealQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = match query.user_id {
        Some(id) if id != 0 => id,
        _ => return Err(ApiError::Validation("userId is required".into())),
    };

    let prompt = load_prompt(&state, &id).await?;
    let expired = lifecycle::is_expired(state.clock.now_millis(), prompt.expires_at);

    let pid = prompt.id.clone();
    let (paid, anyone) = run_db(&state, move |db| {
        Ok((db.has_user_paid(&pid, user_id)?, db.has_anyone_paid(&pid)?))
    })
    .await?;
    let state_now = reveal_state(expired, paid, anyone);

    let confessions = if state_now.can_view_confessions() {
        let pid = prompt.id.clone();
        Some(run_db(&state, move |db| db.list_confessions(&pid)).await?)
    } else {
        None
    };

    Ok(Json(RevealResponse {
        reveal_state: state_now,
        confessions,
    }))
}
