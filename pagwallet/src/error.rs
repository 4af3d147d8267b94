use std::time::Duration;

use rust_decimal::Decimal;
use solana_client::client_error::{ClientError, ClientErrorKind};
use thiserror::Error;

use crate::auth::AuthStep;

#[derive(Error, Debug)]
pub enum WalletError {
    // --- validation ---
    #[error("invalid recovery phrase: {0}")]
    InvalidMnemonic(String),

    #[error("recovery phrases don't match")]
    PhraseMismatch,

    #[error("recovery phrase must be {expected} words long, got {actual}")]
    PhraseLength { expected: usize, actual: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount {amount} is below the minimum of {minimum}")]
    AmountBelowMinimum { amount: Decimal, minimum: Decimal },

    #[error("passwords don't match")]
    PasswordMismatch,

    #[error("password must be at least {0} characters long")]
    PasswordTooShort(usize),

    #[error("cannot move from {from} to {to}")]
    InvalidStep { from: AuthStep, to: AuthStep },

    #[error("validation error: {0}")]
    Validation(String),

    // --- authentication ---
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username already exists")]
    UsernameTaken,

    #[error("public key is not registered")]
    UnknownPublicKey,

    #[error("no active session")]
    NoSession,

    #[error("backend did not return a secret key and none is stored locally")]
    MissingSecretKey,

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    // --- network ---
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("rpc request rejected: {0}")]
    RpcRejected(String),

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("operation cancelled")]
    Cancelled,

    // --- decoding / local ---
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("instruction error: {0}")]
    Instruction(String),

    #[error("generative search error: {0}")]
    Search(String),

    #[error("overflow: {0}")]
    Overflow(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WalletError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WalletError::Rpc(_) | WalletError::Timeout { .. } => true,
            WalletError::Request(e) => e.is_timeout() || e.is_connect(),
            WalletError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<ClientError> for WalletError {
    fn from(e: ClientError) -> Self {
        match e.kind() {
            // Transport-level failures may succeed on retry; anything the node
            // answered (preflight failures, bad params) will not.
            ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => WalletError::Rpc(e.to_string()),
            _ => WalletError::RpcRejected(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_and_timeout_are_transient() {
        assert!(WalletError::Rpc("connection reset".into()).is_transient());
        assert!(WalletError::Timeout {
            operation: "getBalance".into(),
            timeout: Duration::from_secs(1),
        }
        .is_transient());
    }

    #[test]
    fn test_server_errors_are_transient() {
        let busy = WalletError::Http {
            status: 503,
            message: String::new(),
        };
        let limited = WalletError::Http {
            status: 429,
            message: String::new(),
        };
        assert!(busy.is_transient());
        assert!(limited.is_transient());
    }

    #[test]
    fn test_validation_errors_are_not_transient() {
        assert!(!WalletError::PhraseMismatch.is_transient());
        assert!(!WalletError::InvalidAddress("x".into()).is_transient());
        assert!(!WalletError::RpcRejected("insufficient funds".into()).is_transient());
        assert!(!WalletError::Http {
            status: 400,
            message: "bad".into(),
        }
        .is_transient());
    }
}
