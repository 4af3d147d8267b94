//! Chain access.
//!
//! Everything the wallet needs from a Solana node goes through [`ChainRpc`].
//! The production implementation is the nonblocking `RpcClient`; responses
//! the client does not type for us are decoded into [`crate::types::rpc`].

use std::future::Future;
use std::time::Duration;

use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcRequest;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use spl_token_2022::extension::{BaseStateWithExtensions, StateWithExtensions};
use spl_token_2022::state::Mint;
use spl_token_metadata_interface::state::TokenMetadata;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::error::{Result, WalletError};
use crate::types::{KeyedTokenAccount, RpcTransaction, SignatureInfo, TokenMetadataInfo};

/// Interval between signature status polls while confirming.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Status of a submitted signature at a given commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Not yet seen at the requested commitment.
    Pending,
    Confirmed,
    /// Landed, but execution failed.
    Failed(String),
}

/// The node operations the wallet relies on.
pub trait ChainRpc: Send + Sync {
    /// Native balance in lamports.
    fn balance(&self, owner: &Pubkey) -> impl Future<Output = Result<u64>> + Send;

    /// Parsed token accounts of `owner` under one token program.
    fn token_accounts(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> impl Future<Output = Result<Vec<KeyedTokenAccount>>> + Send;

    /// Name and symbol of a mint. `None` if the mint carries no metadata.
    fn token_metadata(
        &self,
        mint: &Pubkey,
    ) -> impl Future<Output = Result<Option<TokenMetadataInfo>>> + Send;

    fn account_exists(&self, address: &Pubkey) -> impl Future<Output = Result<bool>> + Send;

    /// Most recent signatures involving `address`, newest first.
    fn signatures(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SignatureInfo>>> + Send;

    fn transaction(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<Option<RpcTransaction>>> + Send;

    fn block_time(&self, slot: u64) -> impl Future<Output = Result<Option<i64>>> + Send;

    fn latest_blockhash(&self) -> impl Future<Output = Result<Hash>> + Send;

    fn rent_exemption(&self, data_len: usize) -> impl Future<Output = Result<u64>> + Send;

    /// Submit an already-signed transaction without waiting for confirmation.
    fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> impl Future<Output = Result<Signature>> + Send;

    fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<SignatureState>> + Send;

    fn airdrop(
        &self,
        to: &Pubkey,
        lamports: u64,
    ) -> impl Future<Output = Result<Signature>> + Send;
}

impl ChainRpc for RpcClient {
    async fn balance(&self, owner: &Pubkey) -> Result<u64> {
        debug!(%owner, "getBalance");
        Ok(self.get_balance(owner).await?)
    }

    async fn token_accounts(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<KeyedTokenAccount>> {
        debug!(%owner, %program_id, "getTokenAccountsByOwner");
        let response: crate::types::Contextual<Vec<KeyedTokenAccount>> = self
            .send(
                RpcRequest::GetTokenAccountsByOwner,
                json!([
                    owner.to_string(),
                    { "programId": program_id.to_string() },
                    { "encoding": "jsonParsed", "commitment": self.commitment().commitment },
                ]),
            )
            .await?;
        Ok(response.value)
    }

    async fn token_metadata(&self, mint: &Pubkey) -> Result<Option<TokenMetadataInfo>> {
        debug!(%mint, "getAccountInfo (mint)");
        let account = self
            .get_account_with_commitment(mint, self.commitment())
            .await?
            .value;
        match account {
            Some(account) if account.owner == spl_token_2022::id() => {
                decode_token_metadata(mint, &account.data)
            }
            _ => Ok(None),
        }
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        debug!(%address, "getAccountInfo");
        Ok(self
            .get_account_with_commitment(address, self.commitment())
            .await?
            .value
            .is_some())
    }

    async fn signatures(&self, address: &Pubkey, limit: usize) -> Result<Vec<SignatureInfo>> {
        debug!(%address, limit, "getSignaturesForAddress");
        Ok(self
            .send(
                RpcRequest::GetSignaturesForAddress,
                json!([
                    address.to_string(),
                    { "limit": limit, "commitment": self.commitment().commitment },
                ]),
            )
            .await?)
    }

    async fn transaction(&self, signature: &str) -> Result<Option<RpcTransaction>> {
        debug!(signature, "getTransaction");
        Ok(self
            .send(
                RpcRequest::GetTransaction,
                json!([
                    signature,
                    {
                        "encoding": "json",
                        "commitment": self.commitment().commitment,
                        "maxSupportedTransactionVersion": 0,
                    },
                ]),
            )
            .await?)
    }

    async fn block_time(&self, slot: u64) -> Result<Option<i64>> {
        debug!(slot, "getBlockTime");
        Ok(Some(self.get_block_time(slot).await?))
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.get_latest_blockhash().await?)
    }

    async fn rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(self.get_minimum_balance_for_rent_exemption(data_len).await?)
    }

    async fn submit_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        Ok(self.send_transaction(transaction).await?)
    }

    async fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState> {
        let status = self
            .get_signature_status_with_commitment(signature, commitment)
            .await?;
        Ok(match status {
            None => SignatureState::Pending,
            Some(Ok(())) => SignatureState::Confirmed,
            Some(Err(e)) => SignatureState::Failed(e.to_string()),
        })
    }

    async fn airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature> {
        debug!(%to, lamports, "requestAirdrop");
        Ok(self.request_airdrop(to, lamports).await?)
    }
}

/// Read name and symbol from a Token-2022 mint's embedded metadata.
///
/// # Errors
///
/// Returns `WalletError::Decode` if `data` is not a mint account.
pub fn decode_token_metadata(mint: &Pubkey, data: &[u8]) -> Result<Option<TokenMetadataInfo>> {
    let state = StateWithExtensions::<Mint>::unpack(data)
        .map_err(|e| WalletError::Decode(format!("mint {mint}: {e}")))?;
    Ok(state
        .get_variable_len_extension::<TokenMetadata>()
        .ok()
        .map(|metadata| TokenMetadataInfo {
            mint: mint.to_string(),
            name: metadata.name,
            symbol: metadata.symbol,
            uri: metadata.uri,
        }))
}

// ---------------------------------------------------------------------------
// Timeout / retry
// ---------------------------------------------------------------------------

/// Bound a call by `timeout`.
pub async fn with_timeout<T, F>(operation: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(WalletError::Timeout {
            operation: operation.to_string(),
            timeout,
        }),
    }
}

/// Run `f` until it succeeds, fails permanently, or `policy` is exhausted.
///
/// Only errors for which [`WalletError::is_transient`] holds are retried.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(operation, attempt, ?delay, error = %e, "transient failure, retrying");
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read-side access to a [`ChainRpc`] with a per-call timeout and retries.
pub struct RpcCaller<'a, R> {
    rpc: &'a R,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<'a, R> Clone for RpcCaller<'a, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, R> Copy for RpcCaller<'a, R> {}

impl<'a, R: ChainRpc> RpcCaller<'a, R> {
    pub fn new(rpc: &'a R, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            rpc,
            timeout,
            retry,
        }
    }

    pub fn rpc(&self) -> &'a R {
        self.rpc
    }

    pub async fn call<T, F, Fut>(&self, operation: &str, f: F) -> Result<T>
    where
        F: Fn(&'a R) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let rpc = self.rpc;
        with_retry(&self.retry, operation, || {
            with_timeout(operation, self.timeout, f(rpc))
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Submit a signed transaction and wait until it reaches `commitment`.
///
/// The transaction is never re-signed here; its first signature identifies it
/// across resends. After a transient send failure the signature is looked up
/// before the same bytes are sent again, so a lost response cannot produce a
/// second transfer.
pub async fn submit_and_confirm<R: ChainRpc>(
    rpc: &R,
    transaction: &Transaction,
    commitment: CommitmentConfig,
    retry: &RetryPolicy,
    request_timeout: Duration,
    confirm_timeout: Duration,
) -> Result<Signature> {
    let signature = *transaction
        .signatures
        .first()
        .filter(|s| **s != Signature::default())
        .ok_or_else(|| WalletError::Instruction("transaction is not signed".into()))?;

    let mut attempt = 1;
    loop {
        match with_timeout(
            "sendTransaction",
            request_timeout,
            rpc.submit_transaction(transaction),
        )
        .await
        {
            Ok(_) => break,
            Err(e) if e.is_transient() => {
                let landed = rpc
                    .signature_state(&signature, CommitmentConfig::processed())
                    .await;
                if matches!(landed, Ok(SignatureState::Confirmed | SignatureState::Failed(_))) {
                    debug!(%signature, "send failed but signature already landed");
                    break;
                }
                if attempt >= retry.max_attempts {
                    return Err(e);
                }
                let delay = retry.delay_for(attempt);
                warn!(%signature, attempt, ?delay, error = %e, "resending signed transaction");
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(%signature, commitment = ?commitment.commitment, "transaction submitted");
    confirm_signature(rpc, &signature, commitment, confirm_timeout).await?;
    Ok(signature)
}

/// Poll until `signature` reaches `commitment`.
pub async fn confirm_signature<R: ChainRpc>(
    rpc: &R,
    signature: &Signature,
    commitment: CommitmentConfig,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        match rpc.signature_state(signature, commitment).await {
            Ok(SignatureState::Confirmed) => {
                info!(%signature, "transaction confirmed");
                return Ok(());
            }
            Ok(SignatureState::Failed(reason)) => {
                return Err(WalletError::TransactionFailed {
                    signature: signature.to_string(),
                    reason,
                })
            }
            Ok(SignatureState::Pending) => {}
            Err(e) if e.is_transient() => debug!(%signature, error = %e, "status poll failed"),
            Err(e) => return Err(e),
        }
        if Instant::now() >= deadline {
            return Err(WalletError::Timeout {
                operation: format!("confirming {signature}"),
                timeout,
            });
        }
        sleep(CONFIRM_POLL_INTERVAL).await;
    }
}

// ---------------------------------------------------------------------------
// In-memory node for tests
// ---------------------------------------------------------------------------
