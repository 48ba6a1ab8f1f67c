use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ChainError, Result};

fn decode_fixed<const N: usize>(kind: &'static str, s: &str) -> Result<[u8; N]> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| ChainError::Parse {
            kind,
            reason: "missing 0x prefix".into(),
        })?;

    if digits.len() != N * 2 {
        return Err(ChainError::Parse {
            kind,
            reason: format!("expected {} hex digits, got {}", N * 2, digits.len()),
        });
    }

    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| ChainError::Parse {
        kind,
        reason: e.to_string(),
    })?;
    Ok(out)
}

/// 20-byte EVM account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The address as a left-padded 32-byte ABI word.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        decode_fixed("address", s).map(Self)
    }
}

impl TryFrom<String> for Address {
    type Error = ChainError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// 32-byte transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(pub [u8; 32]);

impl FromStr for TxHash {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        decode_fixed("transaction hash", s).map(Self)
    }
}

impl TryFrom<String> for TxHash {
    type Error = ChainError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TxHash> for String {
    fn from(h: TxHash) -> Self {
        h.to_string()
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Token quantity in base units (for USDC, millionths of a dollar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(pub u128);

impl TokenAmount {
    /// Parse a human decimal like `"1.50"` for a token with `decimals` places.
    pub fn parse_decimal(s: &str, decimals: u8) -> Result<Self> {
        let bad = |reason: String| ChainError::Parse {
            kind: "token amount",
            reason,
        };

        let s = s.trim();
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(bad("empty amount".into()));
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(bad(format!("'{}' is not a decimal number", s)));
        }
        if frac.len() > decimals as usize {
            return Err(bad(format!("more than {} decimal places", decimals)));
        }

        let scale = 10u128
            .checked_pow(decimals as u32)
            .ok_or_else(|| bad("too many decimals".into()))?;
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| bad("amount too large".into()))?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = decimals as usize);
            padded.parse().map_err(|_| bad("bad fraction".into()))?
        };

        whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(|| bad("amount too large".into()))
    }

    /// Big-endian 32-byte ABI word.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&self.0.to_be_bytes());
        word
    }

    /// Read an ABI uint256 word. Values that do not fit in u128 saturate.
    pub fn from_word(word: &[u8; 32]) -> Self {
        if word[..16].iter().any(|b| *b != 0) {
            return Self(u128::MAX);
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Self(u128::from_be_bytes(low))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parse_and_display() {
        let a: Address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap();
        assert_eq!(a.to_string(), "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");
        assert_eq!(&a.to_word()[..12], &[0u8; 12]);

        assert!("833589fcd6edb6e08f4c7c32d4f71b54bda02913".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz3589fcd6edb6e08f4c7c32d4f71b54bda02913".parse::<Address>().is_err());
    }

    #[test]
    fn tx_hash_requires_32_bytes() {
        let h = format!("0x{}", "ab".repeat(32));
        assert_eq!(h.parse::<TxHash>().unwrap().to_string(), h);
        assert!("0xabcd".parse::<TxHash>().is_err());
    }

    #[test]
    fn decimal_amounts() {
        assert_eq!(TokenAmount::parse_decimal("1.50", 6).unwrap(), TokenAmount(1_500_000));
        assert_eq!(TokenAmount::parse_decimal("2", 6).unwrap(), TokenAmount(2_000_000));
        assert_eq!(TokenAmount::parse_decimal(".5", 6).unwrap(), TokenAmount(500_000));
        assert_eq!(TokenAmount::parse_decimal("0.000001", 6).unwrap(), TokenAmount(1));
        assert!(TokenAmount::parse_decimal("0.0000001", 6).is_err());
        assert!(TokenAmount::parse_decimal("-1", 6).is_err());
        assert!(TokenAmount::parse_decimal("", 6).is_err());
        assert!(TokenAmount::parse_decimal("1.2.3", 6).is_err());
    }

    #[test]
    fn amount_words() {
        let amt = TokenAmount(1_000_000);
        let word = amt.to_word();
        assert_eq!(hex::encode(word), format!("{:064x}", 1_000_000u128));
        assert_eq!(TokenAmount::from_word(&word), amt);

        let mut huge = [0u8; 32];
        huge[0] = 1;
        assert_eq!(TokenAmount::from_word(&huge), TokenAmount(u128::MAX));
    }
}
