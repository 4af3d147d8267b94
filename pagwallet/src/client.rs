use std::sync::Arc;

use rust_decimal::Decimal;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::assembler::{check_native_send, check_token_send, SendCheck, Submitter};
use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::history::fetch_history;
use crate::query::{get_balance, list_token_holdings};
use crate::rpc::{ChainRpc, RpcCaller};
use crate::session::Session;
use crate::types::{CreatedToken, NewToken, TokenHolding, TransactionRecord, TransferReceipt};

/// A signed-in wallet: configuration, chain access and the active session.
pub struct Wallet<R = RpcClient> {
    config: WalletConfig,
    rpc: Arc<R>,
    session: Session,
}

impl Wallet<RpcClient> {
    /// Connect to the configured RPC endpoint.
    pub fn connect(config: WalletConfig, session: Session) -> Self {
        let rpc = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            config.request_timeout,
            config.commitment,
        );
        Self::with_rpc(config, Arc::new(rpc), session)
    }
}

impl<R: ChainRpc> Wallet<R> {
    pub fn with_rpc(config: WalletConfig, rpc: Arc<R>, session: Session) -> Self {
        Self {
            config,
            rpc,
            session,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Public key of the session wallet.
    pub fn address(&self) -> Pubkey {
        self.session.pubkey()
    }

    fn caller(&self) -> RpcCaller<'_, R> {
        RpcCaller::new(self.rpc.as_ref(), self.config.request_timeout, self.config.retry)
    }

    fn submitter(&self) -> Submitter<'_, R> {
        Submitter::new(self.rpc.as_ref(), self.session.keypair(), &self.config)
    }

    // --- Query ---

    /// Native balance in SOL.
    pub async fn balance(&self) -> Result<Decimal> {
        get_balance(self.caller(), &self.address()).await
    }

    pub async fn token_holdings(&self, cancel: &CancellationToken) -> Result<Vec<TokenHolding>> {
        list_token_holdings(self.caller(), &self.address(), cancel).await
    }

    /// The holding for `mint`, or a validation error if the wallet has none.
    pub async fn find_holding(&self, mint: &str, cancel: &CancellationToken) -> Result<TokenHolding> {
        let mint = mint.trim();
        self.token_holdings(cancel)
            .await?
            .into_iter()
            .find(|h| h.mint == mint)
            .ok_or_else(|| WalletError::Validation(format!("wallet holds no token with mint {mint}")))
    }

    /// Recent transfers, newest first. `limit` defaults to the configured
    /// history limit.
    pub async fn history(
        &self,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TransactionRecord>> {
        let limit = limit.unwrap_or(self.config.history_limit);
        fetch_history(self.caller(), &self.address(), limit, cancel).await
    }

    // --- Transfers ---

    /// Balance for preflight advisories; a failed read only drops them.
    async fn last_balance(&self) -> Option<Decimal> {
        match self.balance().await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(error = %e, "balance unavailable for preflight");
                None
            }
        }
    }

    /// Validate a SOL transfer before asking for confirmation.
    pub async fn prepare_send_sol(&self, amount: &str, recipient: &str) -> Result<SendCheck> {
        // Address and amount are validated before any network call.
        check_native_send(amount, recipient, None)?;
        let balance = self.last_balance().await;
        check_native_send(amount, recipient, balance)
    }

    pub async fn send_sol(&self, check: &SendCheck) -> Result<TransferReceipt> {
        self.submitter().send_sol(check).await
    }

    /// Validate a token transfer and resolve the holding it draws from.
    pub async fn prepare_send_token(
        &self,
        mint: &str,
        amount: &str,
        recipient: &str,
        cancel: &CancellationToken,
    ) -> Result<(TokenHolding, SendCheck)> {
        crate::utils::parse_address(recipient)?;
        let holding = self.find_holding(mint, cancel).await?;
        let balance = self.last_balance().await;
        let check = check_token_send(amount, recipient, &holding, balance)?;
        Ok((holding, check))
    }

    pub async fn send_token(&self, check: &SendCheck, holding: &TokenHolding) -> Result<TransferReceipt> {
        self.submitter().send_token(check, holding).await
    }

    pub async fn create_token(&self, token: &NewToken) -> Result<CreatedToken> {
        self.submitter().create_token(token).await
    }

    /// Buy `sol` whole SOL; on devnet this is a faucet airdrop.
    pub async fn airdrop(&self, sol: u64) -> Result<TransferReceipt> {
        self.submitter().airdrop(sol).await
    }
}
