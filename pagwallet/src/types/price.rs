use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// CoinGecko `simple/price?ids=solana&vs_currencies=usd` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplePriceResponse {
    pub solana: UsdPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsdPrice {
    pub usd: Decimal,
}

/// Quote for buying a whole number of SOL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseQuote {
    pub sol: u64,
    pub price_usd: Decimal,
    /// Amount to spend, rounded to cents.
    pub spend_usd: Decimal,
}
