use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use confess_chain::{Address, TransferExpectation, TxHash};
use confess_types::api::{CreatePromptRequest, PromptDetailResponse, PromptResponse};
use confess_types::lifecycle::{self, reveal_state};
use confess_types::models::{Millis, Prompt, PromptPayment, UserId};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::{AppState, run_db};

pub const MAX_PROMPT_LEN: usize = 280;
pub const MAX_DURATION_HOURS: u32 = 168;
const HOUR_MS: Millis = 60 * 60 * 1000;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerQuery {
    pub viewer_id: Option<UserId>,
}

pub fn prompt_response(prompt: Prompt, now: Millis) -> PromptResponse {
    PromptResponse {
        status: lifecycle::prompt_status(now, prompt.created_at, prompt.expires_at),
        time_remaining: lifecycle::time_remaining(now, prompt.expires_at),
        prompt,
    }
}

/// Load a prompt or fail with 404.
pub async fn load_prompt(state: &AppState, id: &str) -> Result<Prompt, ApiError> {
    let pid = id.to_string();
    run_db(state, move |db| db.get_prompt(&pid))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("prompt {} not found", id)))
}

pub async fn list_prompts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.clamp(1, 100);

    let prompts = run_db(&state, move |db| {
        let ids = db.list_recent_prompt_ids(limit)?;
        db.get_prompts(&ids)
    })
    .await?;

    let now = state.clock.now_millis();
    let body: Vec<PromptResponse> = prompts
        .into_iter()
        .map(|p| prompt_response(p, now))
        .collect();

    Ok(Json(body))
}

/// POST /api/prompts — free while the author has allowance left, otherwise
/// the request must carry a verified creation payment.
pub async fn create_prompt(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreatePromptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("content is required".into()));
    }
    if content.chars().count() > MAX_PROMPT_LEN {
        return Err(ApiError::Validation(format!(
            "content is longer than {} characters",
            MAX_PROMPT_LEN
        )));
    }
    let author_id = match req.author_id {
        Some(id) if id != 0 => id,
        _ => return Err(ApiError::Validation("authorId is required".into())),
    };
    let hours = req.duration_hours.unwrap_or(state.settings.prompt_duration_hours);
    if hours == 0 || hours > MAX_DURATION_HOURS {
        return Err(ApiError::Validation(format!(
            "durationHours must be between 1 and {}",
            MAX_DURATION_HOURS
        )));
    }

    let tx_hash = req
        .transaction_hash
        .as_deref()
        .map(str::parse::<TxHash>)
        .transpose()?;
    let payer = req
        .payer_address
        .as_deref()
        .map(str::parse::<Address>)
        .transpose()?;

    let now = state.clock.now_millis();
    let prompt = Prompt {
        id: Uuid::new_v4().to_string(),
        content,
        author_id,
        created_at: now,
        expires_at: now + hours as Millis * HOUR_MS,
        total_confession_count: 0,
    };

    let stored = match tx_hash {
        Some(hash) => {
            state
                .verifier
                .verify(
                    &hash,
                    &TransferExpectation {
                        recipient: state.settings.treasury,
                        min_amount: state.settings.prompt_price,
                        payer,
                    },
                )
                .await?;

            let payment = PromptPayment {
                prompt_id: prompt.id.clone(),
                author_id,
                transaction_hash: hash.to_string(),
                timestamp: now,
            };
            run_db(&state, move |db| db.create_paid_prompt(&prompt, &payment)).await?
        }
        None => {
            let free = state.settings.free_prompts;
            run_db(&state, move |db| {
                if db.count_free_prompts(author_id)? >= free {
                    return Ok(None);
                }
                db.create_prompt(&prompt).map(Some)
            })
            .await?
            .ok_or_else(|| {
                ApiError::Payment(format!(
                    "free prompt allowance of {} used, creation requires payment",
                    free
                ))
            })?
        }
    };

    info!("Prompt {} opened until {}", stored.id, stored.expires_at);
    Ok((StatusCode::CREATED, Json(prompt_response(stored, now))))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ViewerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = load_prompt(&state, &id).await?;
    let now = state.clock.now_millis();
    let expired = lifecycle::is_expired(now, prompt.expires_at);

    let (has_confessed, reveal) = match query.viewer_id {
        Some(viewer) => {
            let pid = prompt.id.clone();
            let (confessed, paid, anyone) = run_db(&state, move |db| {
                Ok((
                    db.get_confession(&pid, viewer)?.is_some(),
                    db.has_user_paid(&pid, viewer)?,
                    db.has_anyone_paid(&pid)?,
                ))
            })
            .await?;
            (Some(confessed), Some(reveal_state(expired, paid, anyone)))
        }
        None => (None, None),
    };

    Ok(Json(PromptDetailResponse {
        prompt: prompt_response(prompt, now),
        has_confessed,
        reveal_state: reveal,
    }))
}
