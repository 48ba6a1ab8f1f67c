use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use confess_chain::{Address, PaymentVerifier, TokenAmount};
use confess_db::Database;
use confess_types::models::Millis;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub verifier: PaymentVerifier,
    pub settings: Settings,
    pub clock: Clock,
}

/// Product and payment knobs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub prompt_duration_hours: u32,
    /// Unpaid prompts an author may create before creation requires payment.
    /// Paid prompts are not counted against it.
    pub free_prompts: u64,
    pub chain_id: u64,
    pub token: Address,
    pub treasury: Address,
    pub prompt_price: TokenAmount,
    pub reveal_price: TokenAmount,
}

/// Time source for handlers. Tests drive a manual clock.
#[derive(Debug)]
pub enum Clock {
    System,
    Manual(AtomicI64),
}

impl Clock {
    pub fn manual(start: Millis) -> Self {
        Self::Manual(AtomicI64::new(start))
    }

    pub fn now_millis(&self) -> Millis {
        match self {
            Self::System => chrono::Utc::now().timestamp_millis(),
            Self::Manual(t) => t.load(Ordering::Relaxed),
        }
    }

    /// Move a manual clock forward; no effect on the system clock.
    pub fn advance(&self, by: Millis) {
        if let Self::Manual(t) = self {
            t.fetch_add(by, Ordering::Relaxed);
        }
    }
}

/// Run a blocking DB call off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> confess_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Storage("storage task failed".into())
        })?
        .map_err(ApiError::from)
}
