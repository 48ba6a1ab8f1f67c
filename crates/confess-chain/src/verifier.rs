//! Confirms that a client-reported transaction really paid the treasury.
//!
//! The wallet broadcasts the transfer and hands us only the hash. When an
//! RPC endpoint is configured we fetch the receipt and look for a matching
//! ERC-20 `Transfer` log; without one the verifier is disabled and accepts
//! any well-formed hash.
//!
//! A receipt proves that *someone* paid the treasury, not who. Unless the
//! client names the paying wallet in `TransferExpectation::payer`, whoever
//! submits a hash first gets the credit for it.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::erc20::TRANSFER_EVENT_TOPIC;
use crate::types::{Address, TokenAmount, TxHash};
use crate::{ChainError, Result};

#[derive(Debug, Clone)]
pub struct PaymentVerifierConfig {
    /// JSON-RPC endpoint of the chain. `None` disables verification.
    pub rpc_url: Option<String>,
    /// Stablecoin contract whose `Transfer` logs count as payment.
    pub token: Address,
    pub request_timeout: Duration,
}

/// What a payment transaction must have transferred.
#[derive(Debug, Clone, Copy)]
pub struct TransferExpectation {
    pub recipient: Address,
    pub min_amount: TokenAmount,
    /// When set, the transfer must come from this wallet.
    pub payer: Option<Address>,
}

pub struct PaymentVerifier {
    config: PaymentVerifierConfig,
    client: Option<reqwest::Client>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Receipt {
    status: Option<String>,
    #[serde(default)]
    logs: Vec<Log>,
}

#[derive(Debug, Deserialize)]
struct Log {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

impl PaymentVerifier {
    pub fn new(config: PaymentVerifierConfig) -> Result<Self> {
        let client = match &config.rpc_url {
            Some(url) => {
                info!("Payment verifier enabled (rpc={}, token={})", url, config.token);
                Some(
                    reqwest::Client::builder()
                        .timeout(config.request_timeout)
                        .build()?,
                )
            }
            None => {
                warn!("No RPC URL configured - payment transactions are accepted unverified");
                None
            }
        };

        Ok(Self { config, client })
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Check that `hash` is a successful transfer meeting `expect`.
    /// Returns the amount that was actually transferred.
    pub async fn verify(&self, hash: &TxHash, expect: &TransferExpectation) -> Result<TokenAmount> {
        let (Some(client), Some(url)) = (&self.client, &self.config.rpc_url) else {
            debug!("Verification disabled, accepting {}", hash);
            return Ok(expect.min_amount);
        };

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getTransactionReceipt",
            "params": [hash.to_string()],
        });

        let resp: RpcResponse<Receipt> = client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(ChainError::Rpc(format!("{} (code {})", err.message, err.code)));
        }
        let receipt = resp
            .result
            .ok_or_else(|| ChainError::NotFound(hash.to_string()))?;

        let paid = check_receipt(hash, &receipt, &self.config.token, expect)?;
        info!("Verified payment {}: {} units to {}", hash, paid, expect.recipient);
        Ok(paid)
    }
}

pub(crate) fn check_receipt(
    hash: &TxHash,
    receipt: &Receipt,
    token: &Address,
    expect: &TransferExpectation,
) -> Result<TokenAmount> {
    if receipt.status.as_deref() != Some("0x1") {
        return Err(ChainError::Reverted(hash.to_string()));
    }

    let wrong = |reason: String| ChainError::WrongTransfer {
        hash: hash.to_string(),
        expected: format!("{} units to {}", expect.min_amount, expect.recipient),
        reason,
    };

    let mut best: Option<TokenAmount> = None;
    for log in &receipt.logs {
        let Ok(emitter) = log.address.parse::<Address>() else {
            continue;
        };
        if emitter != *token || log.topics.len() != 3 {
            continue;
        }
        if !log.topics[0].eq_ignore_ascii_case(TRANSFER_EVENT_TOPIC) {
            continue;
        }
        if let Some(payer) = expect.payer {
            let Ok(from_word) = parse_word(&log.topics[1]) else {
                continue;
            };
            if from_word[12..] != payer.0 {
                continue;
            }
        }
        let Ok(to_word) = parse_word(&log.topics[2]) else {
            continue;
        };
        if to_word[12..] != expect.recipient.0 {
            continue;
        }
        let Ok(amount_word) = parse_word(&log.data) else {
            continue;
        };

        let amount = TokenAmount::from_word(&amount_word);
        best = best.max(Some(amount));
    }

    match best {
        Some(amount) if amount >= expect.min_amount => Ok(amount),
        Some(amount) => Err(wrong(format!("only {} units transferred", amount))),
        None => Err(wrong("no matching token transfer".into())),
    }
}

fn parse_word(s: &str) -> std::result::Result<[u8; 32], hex::FromHexError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let mut word = [0u8; 32];
    hex::decode_to_slice(digits, &mut word)?;
    Ok(word)
}
