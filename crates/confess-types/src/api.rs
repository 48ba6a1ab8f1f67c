use serde::{Deserialize, Serialize};

use crate::lifecycle::{PromptStatus, RevealState};
use crate::models::{Confession, ConfessionKind, Millis, PaymentRecord, Prompt, UserId};

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Prompts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePromptRequest {
    #[serde(default)]
    pub content: String,
    pub author_id: Option<UserId>,
    pub duration_hours: Option<u32>,
    pub transaction_hash: Option<String>,
    /// Wallet that sent the creation payment.
    pub payer_address: Option<String>,
}

/// A prompt plus its derived status at response time.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
    #[serde(flatten)]
    pub prompt: Prompt,
    pub status: PromptStatus,
    pub time_remaining: Millis,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDetailResponse {
    #[serde(flatten)]
    pub prompt: PromptResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_confessed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal_state: Option<RevealState>,
}

// -- Confessions --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateConfessionRequest {
    #[serde(default)]
    pub prompt_id: String,
    pub user_id: Option<UserId>,
    pub kind: ConfessionKind,
    pub image_url: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealResponse {
    pub reveal_state: RevealState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confessions: Option<Vec<Confession>>,
}

// -- Payments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecordPaymentRequest {
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub transaction_hash: String,
    /// Wallet that sent the payment. When given, the transfer must come from it.
    pub payer_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentResponse {
    /// False when this user had already paid for the prompt.
    pub recorded: bool,
    pub reveal_state: RevealState,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub has_user_paid: bool,
    pub has_anyone_paid: bool,
    pub payer_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal_state: Option<RevealState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPurpose {
    Prompt,
    Reveal,
}

/// A typed token transfer for the client wallet to submit as-is.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub purpose: PaymentPurpose,
    pub chain_id: u64,
    /// Token contract, the `to` of the transaction.
    pub token: String,
    /// Who receives the tokens.
    pub recipient: String,
    /// Amount in token base units, decimal string.
    pub amount: String,
    /// ABI-encoded `transfer(recipient, amount)` calldata.
    pub data: String,
}

// -- Users --

/// Which prompts a user answered. The answer itself stays behind the reveal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfessionSummary {
    pub prompt_id: String,
    pub timestamp: Millis,
}

impl From<&Confession> for ConfessionSummary {
    fn from(c: &Confession) -> Self {
        Self {
            prompt_id: c.prompt_id.clone(),
            timestamp: c.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInteractionsResponse {
    pub user_id: UserId,
    pub prompts: Vec<PromptResponse>,
    pub confessions: Vec<ConfessionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPaymentsResponse {
    pub user_id: UserId,
    pub payments: Vec<PaymentRecord>,
}
