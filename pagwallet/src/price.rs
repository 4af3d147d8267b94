//! SOL/USD quotes for the buy flow.

use std::time::Duration;

use reqwest::Client;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::types::{PurchaseQuote, SimplePriceResponse};

/// Client for the CoinGecko simple price endpoint.
#[derive(Debug, Clone)]
pub struct PriceClient {
    client: Client,
    base_url: String,
}

impl PriceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        Self::new(&config.price_url, config.request_timeout)
    }

    /// Current SOL price in USD.
    pub async fn sol_usd(&self) -> Result<Decimal> {
        let url = format!("{}/simple/price", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("ids", "solana"), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(WalletError::Http { status, message });
        }

        let body: SimplePriceResponse = resp.json().await?;
        Ok(body.solana.usd)
    }

    /// Quote for `sol` whole SOL at the current price.
    pub async fn quote(&self, sol: u64) -> Result<PurchaseQuote> {
        let price = self.sol_usd().await?;
        quote_for(sol, price)
    }
}

/// Price `sol` whole SOL at `price_usd`, rounded to cents.
pub fn quote_for(sol: u64, price_usd: Decimal) -> Result<PurchaseQuote> {
    if sol == 0 {
        return Err(WalletError::InvalidAmount(
            "must buy at least 1 SOL".into(),
        ));
    }
    let spend = price_usd
        .checked_mul(Decimal::from(sol))
        .ok_or_else(|| WalletError::Overflow(format!("{sol} SOL at {price_usd} USD")))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(PurchaseQuote {
        sol,
        price_usd,
        spend_usd: spend,
    })
}

/// Parse a purchase amount; only whole SOL can be bought.
pub fn parse_whole_sol(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    trimmed
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            WalletError::InvalidAmount(format!("{trimmed:?} is not a whole number of SOL"))
        })
}
