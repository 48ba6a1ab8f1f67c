//! On-chain payment plumbing: typed ERC-20 transfer calls and receipt checks.

pub mod erc20;
pub mod types;
pub mod verifier;

pub use erc20::Erc20Call;
pub use types::{Address, TokenAmount, TxHash};
pub use verifier::{PaymentVerifier, PaymentVerifierConfig, TransferExpectation};

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid {kind}: {reason}")]
    Parse { kind: &'static str, reason: String },

    #[error("transaction {0} not found or still pending")]
    NotFound(String),

    #[error("transaction {0} reverted")]
    Reverted(String),

    #[error("transaction {hash} does not pay {expected}: {reason}")]
    WrongTransfer {
        hash: String,
        expected: String,
        reason: String,
    },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;
