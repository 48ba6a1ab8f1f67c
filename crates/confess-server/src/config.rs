use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use confess_api::state::Settings;
use confess_chain::{Address, PaymentVerifierConfig, TokenAmount};

/// USDC on Base.
const DEFAULT_TOKEN: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
const DEFAULT_CHAIN_ID: u64 = 8453;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub settings: Settings,
    pub verifier: PaymentVerifierConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("CONFESS_HOST", "0.0.0.0");
        let port: u16 = var("CONFESS_PORT", "3000")
            .parse()
            .context("CONFESS_PORT")?;
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

        let db_path: PathBuf = var("CONFESS_DB_PATH", "confess.db").into();

        let decimals: u8 = var("CONFESS_TOKEN_DECIMALS", "6")
            .parse()
            .context("CONFESS_TOKEN_DECIMALS")?;
        let token: Address = var("CONFESS_TOKEN_ADDRESS", DEFAULT_TOKEN)
            .parse()
            .context("CONFESS_TOKEN_ADDRESS")?;
        let treasury: Address = lookup("CONFESS_TREASURY_ADDRESS")
            .ok_or_else(|| anyhow!("CONFESS_TREASURY_ADDRESS must be set"))?
            .parse()
            .context("CONFESS_TREASURY_ADDRESS")?;

        let settings = Settings {
            prompt_duration_hours: var("CONFESS_PROMPT_HOURS", "24")
                .parse()
                .context("CONFESS_PROMPT_HOURS")?,
            free_prompts: var("CONFESS_FREE_PROMPTS", "1")
                .parse()
                .context("CONFESS_FREE_PROMPTS")?,
            chain_id: var("CONFESS_CHAIN_ID", &DEFAULT_CHAIN_ID.to_string())
                .parse()
                .context("CONFESS_CHAIN_ID")?,
            token,
            treasury,
            prompt_price: TokenAmount::parse_decimal(&var("CONFESS_PROMPT_PRICE", "1.00"), decimals)
                .context("CONFESS_PROMPT_PRICE")?,
            reveal_price: TokenAmount::parse_decimal(&var("CONFESS_REVEAL_PRICE", "0.50"), decimals)
                .context("CONFESS_REVEAL_PRICE")?,
        };

        let verifier = PaymentVerifierConfig {
            rpc_url: lookup("CONFESS_RPC_URL").filter(|u| !u.is_empty()),
            token,
            request_timeout: Duration::from_secs(10),
        };

        Ok(Self {
            addr,
            db_path,
            settings,
            verifier,
        })
    }
}
