use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::info;

use confess_chain::{Address, Erc20Call, TransferExpectation, TxHash};
use confess_types::api::{
    PaymentIntentResponse, PaymentPurpose, PaymentStatusResponse, RecordPaymentRequest,
    RecordPaymentResponse,
};
use confess_types::lifecycle::{self, RevealState, reveal_state};
use confess_types::models::{PaymentRecord, UserId};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::prompts::load_prompt;
use crate::state::{AppState, run_db};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusQuery {
    pub user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct IntentQuery {
    pub purpose: PaymentPurpose,
}

async fn current_reveal_state(
    state: &AppState,
    prompt_id: &str,
    expires_at: i64,
    user_id: UserId,
) -> Result<RevealState, ApiError> {
    let pid = prompt_id.to_string();
    let (paid, anyone) = run_db(state, move |db| {
        Ok((db.has_user_paid(&pid, user_id)?, db.has_anyone_paid(&pid)?))
    })
    .await?;
    let expired = lifecycle::is_expired(state.clock.now_millis(), expires_at);
    Ok(reveal_state(expired, paid, anyone))
}

/// POST /api/prompts/{id}/payments — record a confirmed reveal payment.
pub async fn record_payment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<RecordPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = match req.user_id {
        Some(id) if id != 0 => id,
        _ => return Err(ApiError::Validation("userId is required".into())),
    };
    let hash: TxHash = req.transaction_hash.trim().parse()?;
    let payer = req
        .payer_address
        .as_deref()
        .map(str::parse::<Address>)
        .transpose()?;

    let prompt = load_prompt(&state, &id).await?;

    let before = current_reveal_state(&state, &prompt.id, prompt.expires_at, user_id).await?;
    match before {
        RevealState::ActivePaid | RevealState::ExpiredPaid => {
            return Ok((
                StatusCode::OK,
                Json(RecordPaymentResponse {
                    recorded: false,
                    reveal_state: before,
                }),
            ));
        }
        RevealState::ExpiredNoPayers => {
            return Err(ApiError::Gone(
                "prompt ended without reveals; its answers are burned".into(),
            ));
        }
        RevealState::ActiveUnpaid | RevealState::ExpiredOthersPaid => {}
    }

    state
        .verifier
        .verify(
            &hash,
            &TransferExpectation {
                recipient: state.settings.treasury,
                min_amount: state.settings.reveal_price,
                payer,
            },
        )
        .await?;

    let payment = PaymentRecord {
        prompt_id: prompt.id.clone(),
        user_id,
        transaction_hash: hash.to_string(),
        timestamp: state.clock.now_millis(),
    };
    let recorded = run_db(&state, move |db| db.record_payment(&payment)).await?;

    let after = current_reveal_state(&state, &prompt.id, prompt.expires_at, user_id).await?;
    info!("Reveal of {} for {}: {:?} -> {:?}", prompt.id, user_id, before, after);

    let status = if recorded { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(RecordPaymentResponse {
            recorded,
            reveal_state: after,
        }),
    ))
}

/// GET /api/prompts/{id}/payments
pub async fn payment_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<PaymentStatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = load_prompt(&state, &id).await?;
    let expired = lifecycle::is_expired(state.clock.now_millis(), prompt.expires_at);

    let pid = prompt.id.clone();
    let viewer = query.user_id.filter(|id| *id != 0);
    let (has_user_paid, payer_count) = run_db(&state, move |db| {
        let paid = match viewer {
            Some(uid) => db.has_user_paid(&pid, uid)?,
            None => false,
        };
        Ok((paid, db.payer_count(&pid)?))
    })
    .await?;

    let has_anyone_paid = payer_count > 0;
    Ok(Json(PaymentStatusResponse {
        has_user_paid,
        has_anyone_paid,
        payer_count,
        reveal_state: viewer.map(|_| reveal_state(expired, has_user_paid, has_anyone_paid)),
    }))
}

/// GET /api/payments/intent — the exact transfer a wallet should submit.
pub async fn payment_intent(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IntentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = &state.settings;
    let amount = match query.purpose {
        PaymentPurpose::Prompt => settings.prompt_price,
        PaymentPurpose::Reveal => settings.reveal_price,
    };
    let call = Erc20Call::Transfer {
        to: settings.treasury,
        amount,
    };

    Ok(Json(PaymentIntentResponse {
        purpose: query.purpose,
        chain_id: settings.chain_id,
        token: settings.token.to_string(),
        recipient: settings.treasury.to_string(),
        amount: amount.to_string(),
        data: call.calldata_hex(),
    }))
}
