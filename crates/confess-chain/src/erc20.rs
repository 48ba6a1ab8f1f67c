use crate::types::{Address, TokenAmount};

/// `transfer(address,uint256)` selector.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// keccak256("Transfer(address,address,uint256)"), topic 0 of every ERC-20 transfer log.
pub const TRANSFER_EVENT_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// ERC-20 calls the app asks wallets to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Erc20Call {
    Transfer { to: Address, amount: TokenAmount },
}

impl Erc20Call {
    pub fn calldata(&self) -> Vec<u8> {
        match self {
            Self::Transfer { to, amount } => {
                let mut data = Vec::with_capacity(4 + 64);
                data.extend_from_slice(&TRANSFER_SELECTOR);
                data.extend_from_slice(&to.to_word());
                data.extend_from_slice(&amount.to_word());
                data
            }
        }
    }

    /// `0x`-prefixed calldata, ready for `eth_sendTransaction`.
    pub fn calldata_hex(&self) -> String {
        format!("0x{}", hex::encode(self.calldata()))
    }
}
