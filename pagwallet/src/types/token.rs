use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Name and symbol of a mint, read from its on-chain metadata extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadataInfo {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub uri: String,
}

/// A fungible token balance held by the wallet owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// The token account holding the balance.
    pub account: String,
    pub mint: String,
    pub name: String,
    pub symbol: String,
    /// Decimal-adjusted amount.
    pub amount: Decimal,
    pub decimals: u8,
    /// Amount in the mint's smallest unit.
    pub raw_amount: u64,
    /// Token program that owns the account (SPL Token or Token-2022).
    #[serde(with = "pubkey_string")]
    pub program_id: Pubkey,
}

/// Parameters for minting a new Token-2022 token.
#[derive(Debug, Clone, PartialEq)]
pub struct NewToken {
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// Initial supply in whole tokens.
    pub supply: Decimal,
}

/// Result of a successful `create_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedToken {
    pub mint: Pubkey,
    pub token_account: Pubkey,
    pub signature: String,
}

mod pubkey_string {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(d)?;
        Pubkey::from_str(&raw).map_err(serde::de::Error::custom)
    }
}
