//! Wire types for the JSON-RPC responses the wallet decodes itself.
//!
//! Only the fields the wallet reads are modeled; unknown fields are ignored,
//! but a missing required field or a wrong type fails the decode.

use serde::{Deserialize, Serialize};

/// `{"context": {...}, "value": T}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contextual<T> {
    pub value: T,
}

/// One entry of `getSignaturesForAddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

/// `getTransaction` result with `json` encoding.
///
/// Every field is optional at this level so that incomplete records can be
/// detected and dropped instead of failing the whole history view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub transaction: Option<RpcTransactionBody>,
    #[serde(default)]
    pub meta: Option<RpcTransactionMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionBody {
    #[serde(default)]
    pub signatures: Vec<String>,
    pub message: RpcMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcMessage {
    #[serde(default)]
    pub account_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionMeta {
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<RpcTokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<RpcTokenBalance>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTokenBalance {
    pub account_index: u8,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub program_id: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

/// Token amount as reported by the RPC node. `amount` is the raw integer as a
/// string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

/// One entry of `getTokenAccountsByOwner` with `jsonParsed` encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedTokenAccount {
    pub pubkey: String,
    pub account: ParsedAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedAccount {
    pub owner: String,
    #[serde(default)]
    pub lamports: u64,
    pub data: ParsedAccountData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedAccountData {
    pub program: String,
    pub parsed: ParsedTokenAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTokenAccount {
    #[serde(rename = "type")]
    pub kind: String,
    pub info: TokenAccountInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountInfo {
    pub mint: String,
    pub owner: String,
    pub token_amount: UiTokenAmount,
    #[serde(default)]
    pub state: Option<String>,
}
