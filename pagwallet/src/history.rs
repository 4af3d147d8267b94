//! Recent transfers of the wallet, normalized from raw transactions.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, WalletError};
use crate::query::fetch_metadata_map;
use crate::rpc::{ChainRpc, RpcCaller};
use crate::types::{
    RpcTokenBalance, RpcTransaction, SignatureInfo, TokenMetadataInfo, TransactionRecord,
    NATIVE_SYMBOL,
};
use crate::utils::{from_base_units, shorten_address, NATIVE_DECIMALS};

/// Most signatures a single `getSignaturesForAddress` call returns.
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Reject limits the node would refuse.
pub fn check_history_limit(limit: usize) -> Result<usize> {
    if (1..=MAX_HISTORY_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(WalletError::Validation(format!(
            "history limit must be between 1 and {MAX_HISTORY_LIMIT}, got {limit}"
        )))
    }
}

/// Fetch and normalize the `limit` most recent transfers of `owner`,
/// newest first.
///
/// Transactions that cannot be fetched or lack the fields needed to describe
/// a transfer are left out. Cancelling `cancel` aborts the whole fetch.
pub async fn fetch_history<R: ChainRpc>(
    caller: RpcCaller<'_, R>,
    owner: &Pubkey,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<Vec<TransactionRecord>> {
    let limit = check_history_limit(limit)?;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WalletError::Cancelled),
        result = fetch_records(caller, owner, limit, cancel) => result,
    }
}

async fn fetch_records<R: ChainRpc>(
    caller: RpcCaller<'_, R>,
    owner: &Pubkey,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<Vec<TransactionRecord>> {
    let signatures = caller
        .call("getSignaturesForAddress", move |rpc| rpc.signatures(owner, limit))
        .await?;
    debug!(count = signatures.len(), "signatures fetched");

    let fetched = join_all(signatures.iter().map(|info| async move {
        let tx = caller
            .call("getTransaction", move |rpc| rpc.transaction(&info.signature))
            .await;
        (info, tx)
    }))
    .await;

    let owner_str = owner.to_string();
    let mut pending = Vec::with_capacity(fetched.len());
    for (info, result) in fetched {
        match result {
            Ok(Some(tx)) => match normalize_transaction(&info.signature, &tx, &owner_str) {
                Some(record) => pending.push((info, tx.block_time, record)),
                None => debug!(signature = %info.signature, "incomplete transaction dropped"),
            },
            Ok(None) => debug!(signature = %info.signature, "transaction not found"),
            Err(e) => warn!(signature = %info.signature, error = %e, "transaction fetch failed"),
        }
    }

    let mut records = join_all(pending.into_iter().map(|(info, block_time, mut record)| async move {
        record.time = resolve_time(caller, info, block_time, record.slot).await;
        record
    }))
    .await;

    let mints: Vec<Pubkey> = records
        .iter()
        .filter_map(|r| r.mint.as_deref())
        .filter_map(|m| Pubkey::from_str(m).ok())
        .collect();
    if !mints.is_empty() {
        let metadata = fetch_metadata_map(caller, &mints, cancel).await?;
        for record in &mut records {
            label_token(record, &metadata);
        }
    }

    info!(count = records.len(), "history loaded");
    Ok(records)
}

/// Block time of the transaction, then of the signature entry, then of its
/// slot.
async fn resolve_time<R: ChainRpc>(
    caller: RpcCaller<'_, R>,
    info: &SignatureInfo,
    block_time: Option<i64>,
    slot: u64,
) -> Option<DateTime<Utc>> {
    let seconds = match block_time.or(info.block_time) {
        Some(seconds) => Some(seconds),
        None => match caller
            .call("getBlockTime", move |rpc| rpc.block_time(slot))
            .await
        {
            Ok(seconds) => seconds,
            Err(e) => {
                debug!(slot, error = %e, "block time unavailable");
                None
            }
        },
    };
    seconds.and_then(|s| DateTime::from_timestamp(s, 0))
}

fn label_token(record: &mut TransactionRecord, metadata: &HashMap<String, TokenMetadataInfo>) {
    if let Some(mint) = &record.mint {
        if let Some(info) = metadata.get(mint) {
            record.token = info.symbol.clone();
        }
    }
}

/// Per-account change of a token balance within one transaction.
#[derive(Debug, Clone)]
struct TokenDelta {
    account_index: u8,
    mint: String,
    owner: Option<String>,
    decimals: u8,
    delta: i128,
}

/// Describe a transaction as a single transfer.
///
/// Returns `None` when the slot, the metadata, or the first two account keys
/// are missing. A transaction that changed any token balance is a token
/// transfer; anything else is read as a native transfer from account key 0
/// to account key 1.
pub fn normalize_transaction(
    signature: &str,
    tx: &RpcTransaction,
    owner: &str,
) -> Option<TransactionRecord> {
    let slot = tx.slot?;
    let meta = tx.meta.as_ref()?;
    let keys = &tx.transaction.as_ref()?.message.account_keys;
    if keys.len() < 2 {
        return None;
    }

    let deltas = token_deltas(
        meta.pre_token_balances.as_deref().unwrap_or_default(),
        meta.post_token_balances.as_deref().unwrap_or_default(),
    );

    let transfer = if deltas.is_empty() {
        native_amount(&meta.pre_balances, &meta.post_balances, meta.fee)
            .map(|amount| (keys[0].clone(), keys[1].clone(), amount, None))
    } else {
        token_transfer(&deltas, keys)
    };
    let (sender, recipient, amount, mint) = match transfer {
        Ok(transfer) => transfer,
        Err(e) => {
            warn!(signature, error = %e, "skipping transaction");
            return None;
        }
    };

    let token = match &mint {
        Some(mint) => shorten_address(mint),
        None => NATIVE_SYMBOL.to_string(),
    };

    Some(TransactionRecord {
        signature: signature.to_string(),
        sender_is_self: sender == owner,
        recipient_is_self: recipient == owner,
        sender,
        recipient,
        amount,
        token,
        mint,
        time: None,
        slot,
    })
}

/// Native amount moved: the recipient's gain, or the sender's debit minus
/// the fee when the recipient did not gain.
fn native_amount(pre: &[u64], post: &[u64], fee: u64) -> Result<Decimal> {
    let balance = |list: &[u64], i: usize| list.get(i).copied().unwrap_or(0);
    let gain = balance(post, 1).saturating_sub(balance(pre, 1));
    if gain > 0 {
        return from_base_units(gain, NATIVE_DECIMALS);
    }
    let debit = balance(pre, 0)
        .saturating_sub(balance(post, 0))
        .saturating_sub(fee);
    from_base_units(debit, NATIVE_DECIMALS)
}

fn token_deltas(pre: &[RpcTokenBalance], post: &[RpcTokenBalance]) -> Vec<TokenDelta> {
    let mut by_account: BTreeMap<u8, TokenDelta> = BTreeMap::new();
    let mut apply = |balance: &RpcTokenBalance, sign: i128| {
        let raw: i128 = balance.ui_token_amount.amount.parse().unwrap_or(0);
        let entry = by_account
            .entry(balance.account_index)
            .or_insert_with(|| TokenDelta {
                account_index: balance.account_index,
                mint: balance.mint.clone(),
                owner: balance.owner.clone(),
                decimals: balance.ui_token_amount.decimals,
                delta: 0,
            });
        if entry.owner.is_none() {
            entry.owner = balance.owner.clone();
        }
        entry.delta += sign * raw;
    };
    for balance in pre {
        apply(balance, -1);
    }
    for balance in post {
        apply(balance, 1);
    }
    by_account.into_values().filter(|d| d.delta != 0).collect()
}

fn token_transfer(
    deltas: &[TokenDelta],
    keys: &[String],
) -> Result<(String, String, Decimal, Option<String>)> {
    let party = |delta: &TokenDelta| {
        delta
            .owner
            .clone()
            .or_else(|| keys.get(usize::from(delta.account_index)).cloned())
            .unwrap_or_default()
    };
    let debited = deltas.iter().find(|d| d.delta < 0);
    let credited = deltas.iter().find(|d| d.delta > 0);

    let sender = debited.map(party).unwrap_or_else(|| keys[0].clone());
    let recipient = credited.map(party).unwrap_or_else(|| keys[1].clone());
    let moved = credited.or(debited).unwrap_or(&deltas[0]);
    let raw = u64::try_from(moved.delta.unsigned_abs()).unwrap_or(u64::MAX);
    let amount = from_base_units(raw, u32::from(moved.decimals))?;
    Ok((sender, recipient, amount, Some(moved.mint.clone())))
}
