//! Balance and token-holding reads.

use std::collections::HashMap;
use std::str::FromStr;

use futures_util::stream::{FuturesUnordered, StreamExt};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, WalletError};
use crate::rpc::{ChainRpc, RpcCaller};
use crate::types::{KeyedTokenAccount, TokenHolding, TokenMetadataInfo};
use crate::utils::{from_base_units, shorten_address, NATIVE_DECIMALS};

/// Name shown for mints without readable metadata.
pub const UNKNOWN_TOKEN_NAME: &str = "Unknown token";

/// Token programs whose accounts count as holdings.
pub fn token_programs() -> [Pubkey; 2] {
    [spl_token::id(), spl_token_2022::id()]
}

/// Native balance of `owner` in SOL.
pub async fn get_balance<R: ChainRpc>(caller: RpcCaller<'_, R>, owner: &Pubkey) -> Result<Decimal> {
    let lamports = caller
        .call("getBalance", move |rpc| rpc.balance(owner))
        .await?;
    from_base_units(lamports, NATIVE_DECIMALS)
}

/// Every token account of `owner` under both token programs, labeled with
/// mint metadata.
///
/// A failed metadata lookup only degrades that mint's label.
pub async fn list_token_holdings<R: ChainRpc>(
    caller: RpcCaller<'_, R>,
    owner: &Pubkey,
    cancel: &CancellationToken,
) -> Result<Vec<TokenHolding>> {
    let mut holdings = Vec::new();
    for program_id in token_programs() {
        let program_id = &program_id;
        let accounts = caller
            .call("getTokenAccountsByOwner", move |rpc| {
                rpc.token_accounts(owner, program_id)
            })
            .await?;
        for keyed in &accounts {
            match holding_from_account(keyed, program_id) {
                Ok(Some(holding)) => holdings.push(holding),
                Ok(None) => {}
                Err(e) => warn!(account = %keyed.pubkey, error = %e, "skipping token account"),
            }
        }
    }

    let mints: Vec<Pubkey> = holdings
        .iter()
        .filter_map(|h| Pubkey::from_str(&h.mint).ok())
        .collect();
    let metadata = fetch_metadata_map(caller, &mints, cancel).await?;
    for holding in &mut holdings {
        apply_metadata(holding, metadata.get(&holding.mint));
    }
    debug!(count = holdings.len(), "token holdings loaded");
    Ok(holdings)
}

/// Look up metadata for each distinct mint concurrently.
///
/// The map is keyed by mint address and returned only once every lookup has
/// finished. Mints whose lookup fails or that carry no metadata are absent.
pub async fn fetch_metadata_map<R: ChainRpc>(
    caller: RpcCaller<'_, R>,
    mints: &[Pubkey],
    cancel: &CancellationToken,
) -> Result<HashMap<String, TokenMetadataInfo>> {
    let mut unique = mints.to_vec();
    unique.sort();
    unique.dedup();

    let mut lookups: FuturesUnordered<_> = unique
        .iter()
        .map(|mint| async move {
            let result = caller
                .call("getAccountInfo", move |rpc| rpc.token_metadata(mint))
                .await;
            (mint, result)
        })
        .collect();

    let mut metadata = HashMap::with_capacity(unique.len());
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WalletError::Cancelled),
            next = lookups.next() => match next {
                Some((mint, Ok(Some(info)))) => {
                    metadata.insert(mint.to_string(), info);
                }
                Some((mint, Ok(None))) => debug!(%mint, "mint has no metadata"),
                Some((mint, Err(e))) => warn!(%mint, error = %e, "metadata lookup failed"),
                None => break,
            },
        }
    }
    Ok(metadata)
}

/// Label a holding from looked-up metadata, or with fallbacks.
pub fn apply_metadata(holding: &mut TokenHolding, metadata: Option<&TokenMetadataInfo>) {
    match metadata {
        Some(info) => {
            holding.name = info.name.clone();
            holding.symbol = info.symbol.clone();
        }
        None => {
            holding.name = UNKNOWN_TOKEN_NAME.to_string();
            holding.symbol = shorten_address(&holding.mint);
        }
    }
}

/// Convert a parsed token account into an unlabeled holding.
///
/// Returns `Ok(None)` for parsed entries that are not token accounts.
pub fn holding_from_account(
    keyed: &KeyedTokenAccount,
    program_id: &Pubkey,
) -> Result<Option<TokenHolding>> {
    let parsed = &keyed.account.data.parsed;
    if parsed.kind != "account" {
        return Ok(None);
    }
    let info = &parsed.info;
    let raw_amount: u64 = info
        .token_amount
        .amount
        .parse()
        .map_err(|e| WalletError::Decode(format!("token amount {:?}: {e}", info.token_amount.amount)))?;
    let decimals = info.token_amount.decimals;
    let amount = from_base_units(raw_amount, u32::from(decimals))?;
    Ok(Some(TokenHolding {
        account: keyed.pubkey.clone(),
        mint: info.mint.clone(),
        name: String::new(),
        symbol: String::new(),
        amount,
        decimals,
        raw_amount,
        program_id: *program_id,
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::RetryPolicy;
    use crate::rpc::fake::FakeRpc;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn keyed_account(mint: &Pubkey, owner: &Pubkey, amount: &str, decimals: u8) -> KeyedTokenAccount {
        serde_json::from_value(json!({
            "pubkey": Pubkey::new_unique().to_string(),
            "account": {
                "owner": spl_token_2022::id().to_string(),
                "lamports": 2039280,
                "data": {
                    "program": "spl-token-2022",
                    "parsed": {
                        "type": "account",
                        "info": {
                            "mint": mint.to_string(),
                            "owner": owner.to_string(),
                            "state": "initialized",
                            "tokenAmount": {
                                "amount": amount,
                                "decimals": decimals,
                                "uiAmountString": "ignored"
                            }
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn caller(rpc: &FakeRpc) -> RpcCaller<'_, FakeRpc> {
        RpcCaller::new(rpc, Duration::from_secs(1), RetryPolicy::none())
    }

    fn metadata(mint: &Pubkey, name: &str, symbol: &str) -> TokenMetadataInfo {
        TokenMetadataInfo {
            mint: mint.to_string(),
            name: name.into(),
            symbol: symbol.into(),
            uri: String::new(),
        }
    }

    #[tokio::test]
    async fn test_balance_in_sol() {
        let owner = Pubkey::new_unique();
        let rpc = FakeRpc {
            balances: [(owner, 1_250_000_000)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(get_balance(caller(&rpc), &owner).await.unwrap(), dec!(1.25));
    }

    #[tokio::test]
    async fn test_holdings_from_both_programs_with_metadata() {
        let owner = Pubkey::new_unique();
        let classic = Pubkey::new_unique();
        let modern = Pubkey::new_unique();
        let rpc = FakeRpc {
            token_accounts: [
                ((owner, spl_token::id()), vec![keyed_account(&classic, &owner, "2500000", 6)]),
                (
                    (owner, spl_token_2022::id()),
                    vec![keyed_account(&modern, &owner, "1000000000000", 9)],
                ),
            ]
            .into_iter()
            .collect(),
            metadata: [(modern, metadata(&modern, "Pag Coin", "PAG"))]
                .into_iter()
                .collect(),
            ..Default::default()
        };

        let holdings = list_token_holdings(caller(&rpc), &owner, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(holdings.len(), 2);

        let first = &holdings[0];
        assert_eq!(first.program_id, spl_token::id());
        assert_eq!(first.amount, dec!(2.5));
        assert_eq!(first.name, UNKNOWN_TOKEN_NAME);
        assert_eq!(first.symbol, shorten_address(&classic.to_string()));

        let second = &holdings[1];
        assert_eq!(second.program_id, spl_token_2022::id());
        assert_eq!(second.amount, dec!(1000));
        assert_eq!(second.symbol, "PAG");
        assert_eq!(second.name, "Pag Coin");
    }

    #[tokio::test]
    async fn test_metadata_failure_degrades_label_only() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let rpc = FakeRpc {
            token_accounts: [(
                (owner, spl_token_2022::id()),
                vec![keyed_account(&mint, &owner, "5", 0)],
            )]
            .into_iter()
            .collect(),
            broken_metadata: [mint].into_iter().collect(),
            ..Default::default()
        };
        let holdings = list_token_holdings(caller(&rpc), &owner, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].name, UNKNOWN_TOKEN_NAME);
        assert_eq!(holdings[0].amount, dec!(5));
    }

    #[tokio::test]
    async fn test_metadata_map_keyed_by_mint() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let rpc = FakeRpc {
            metadata: [(a, metadata(&a, "A", "AAA")), (b, metadata(&b, "B", "BBB"))]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let map = fetch_metadata_map(caller(&rpc), &[b, a, b], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&a.to_string()].symbol, "AAA");
        assert_eq!(map[&b.to_string()].symbol, "BBB");
    }

    #[tokio::test]
    async fn test_metadata_map_cancelled() {
        let mint = Pubkey::new_unique();
        let rpc = FakeRpc::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fetch_metadata_map(caller(&rpc), &[mint], &cancel).await;
        assert!(matches!(result, Err(WalletError::Cancelled)));
    }

    #[test]
    fn test_non_account_entries_skipped() {
        let mut keyed = keyed_account(&Pubkey::new_unique(), &Pubkey::new_unique(), "1", 0);
        keyed.account.data.parsed.kind = "mint".into();
        assert!(holding_from_account(&keyed, &spl_token::id()).unwrap().is_none());
    }

    #[test]
    fn test_bad_amount_is_decode_error() {
        let keyed = keyed_account(&Pubkey::new_unique(), &Pubkey::new_unique(), "1.5", 0);
        assert!(matches!(
            holding_from_account(&keyed, &spl_token::id()),
            Err(WalletError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_decimals_skip_only_that_account() {
        let owner = Pubkey::new_unique();
        let good = Pubkey::new_unique();
        let wide = Pubkey::new_unique();
        let huge = Pubkey::new_unique();
        let rpc = FakeRpc {
            token_accounts: [(
                (owner, spl_token_2022::id()),
                vec![
                    keyed_account(&wide, &owner, "1", 29),
                    keyed_account(&good, &owner, "7", 0),
                    keyed_account(&huge, &owner, "1", 255),
                ],
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let holdings = list_token_holdings(caller(&rpc), &owner, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].mint, good.to_string());
        assert_eq!(holdings[0].amount, dec!(7));
    }

    #[test]
    fn test_oversized_decimals_is_overflow_error() {
        let keyed = keyed_account(&Pubkey::new_unique(), &Pubkey::new_unique(), "1", 30);
        assert!(matches!(
            holding_from_account(&keyed, &spl_token::id()),
            Err(WalletError::Overflow(_))
        ));
    }
}
