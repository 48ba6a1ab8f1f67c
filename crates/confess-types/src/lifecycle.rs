//! Time-window and reveal-access derivations for prompts.
//!
//! Everything here is a pure function of its inputs; callers supply `now`.

use serde::{Deserialize, Serialize};

use crate::models::Millis;

/// Width of the "new" and "expiring" windows: two hours.
pub const STATUS_WINDOW_MS: Millis = 2 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStatus {
    New,
    Expiring,
    Active,
    Ended,
}

/// Classify a prompt at `now`.
///
/// Precedence is `Ended`, then `Expiring`, then `New`. A prompt created ten
/// minutes ago with five minutes left is `Expiring`.
pub fn prompt_status(now: Millis, created_at: Millis, expires_at: Millis) -> PromptStatus {
    if now >= expires_at {
        PromptStatus::Ended
    } else if expires_at - now <= STATUS_WINDOW_MS {
        PromptStatus::Expiring
    } else if now - created_at <= STATUS_WINDOW_MS {
        PromptStatus::New
    } else {
        PromptStatus::Active
    }
}

pub fn is_expired(now: Millis, expires_at: Millis) -> bool {
    now >= expires_at
}

/// Milliseconds left in the window, zero once expired.
pub fn time_remaining(now: Millis, expires_at: Millis) -> Millis {
    (expires_at - now).max(0)
}

/// What the reveal page shows a given viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevealState {
    /// Viewer paid, prompt still open.
    ActivePaid,
    /// Viewer paid, prompt closed.
    ExpiredPaid,
    /// Prompt closed and nobody ever paid: the answers are burned.
    ExpiredNoPayers,
    /// Prompt closed, viewer unpaid, but someone else unlocked it.
    ExpiredOthersPaid,
    /// Prompt open, viewer unpaid. Clients send the viewer back to the prompt.
    ActiveUnpaid,
}

impl RevealState {
    pub fn can_view_confessions(&self) -> bool {
        matches!(self, Self::ActivePaid | Self::ExpiredPaid)
    }

    pub fn can_pay(&self) -> bool {
        matches!(self, Self::ActiveUnpaid | Self::ExpiredOthersPaid)
    }
}

/// Derive the reveal state. A viewer who paid always sees the reveal,
/// whatever the expiry or other payers.
pub fn reveal_state(is_expired: bool, has_user_paid: bool, has_anyone_paid: bool) -> RevealState {
    match (has_user_paid, is_expired, has_anyone_paid) {
        (true, false, _) => RevealState::ActivePaid,
        (true, true, _) => RevealState::ExpiredPaid,
        (false, false, _) => RevealState::ActiveUnpaid,
        (false, true, false) => RevealState::ExpiredNoPayers,
        (false, true, true) => RevealState::ExpiredOthersPaid,
    }
}
