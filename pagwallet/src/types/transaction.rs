use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label used for native transfers.
pub const NATIVE_SYMBOL: &str = "SOL";

/// A normalized transfer, derived read-only from chain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    pub sender: String,
    pub recipient: String,
    pub sender_is_self: bool,
    pub recipient_is_self: bool,
    pub amount: Decimal,
    /// Token symbol, `SOL` for native transfers.
    pub token: String,
    /// Mint address for token transfers.
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    pub slot: u64,
}

impl TransactionRecord {
    /// Sender as shown to the user, with a `(You)` suffix for the active wallet.
    pub fn sender_label(&self) -> String {
        party_label(&self.sender, self.sender_is_self)
    }

    pub fn recipient_label(&self) -> String {
        party_label(&self.recipient, self.recipient_is_self)
    }

    /// Timestamp as shown to the user, `Unknown` when the chain had none.
    pub fn time_label(&self) -> String {
        match self.time {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "Unknown".to_string(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.mint.is_none()
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sent {} {} to {}",
            self.sender_label(),
            self.amount,
            self.token,
            self.recipient_label()
        )
    }
}

fn party_label(address: &str, is_self: bool) -> String {
    if is_self {
        format!("{address} (You)")
    } else {
        address.to_string()
    }
}

/// Outcome of a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub signature: String,
}
