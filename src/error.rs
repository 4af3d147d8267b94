use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Wallet(#[from] pagwallet::WalletError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("input closed")]
    InputClosed,

    #[error("cancelled by user")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, CliError>;
