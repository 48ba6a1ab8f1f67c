use serde::{Deserialize, Serialize};

/// Social-network user id ("fid"). Zero is never issued and is treated as missing.
pub type UserId = u64;

/// Unix epoch milliseconds.
pub type Millis = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub content: String,
    pub author_id: UserId,
    pub created_at: Millis,
    pub expires_at: Millis,
    #[serde(default)]
    pub total_confession_count: u64,
}

/// The two possible answers to a "Never have I ever" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfessionKind {
    /// "I have"
    Have,
    /// "I have never"
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confession {
    pub prompt_id: String,
    pub user_id: UserId,
    pub kind: ConfessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub timestamp: Millis,
}

/// A confirmed reveal payment. At most one per (prompt, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub prompt_id: String,
    pub user_id: UserId,
    pub transaction_hash: String,
    pub timestamp: Millis,
}

/// The payment that paid for creating a prompt. Free prompts have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayment {
    pub prompt_id: String,
    pub author_id: UserId,
    pub transaction_hash: String,
    pub timestamp: Millis,
}
