pub mod assembler;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod keys;
pub mod price;
pub mod query;
pub mod rest;
pub mod rpc;
pub mod search;
pub mod session;
pub mod types;
pub mod utils;

// ---- Top-level re-exports for ergonomic usage ----

// Client + config
pub use client::Wallet;
pub use config::{RetryPolicy, WalletConfig};
pub use error::{Result, WalletError};

// Auth + session
pub use auth::{AuthService, AuthStep, AuthWizard};
pub use session::{Session, SessionStore};

// REST + external APIs
pub use price::PriceClient;
pub use rest::BackendHttpClient;
pub use search::GenerativeClient;

// Chain access
pub use rpc::{ChainRpc, SignatureState};

// Transfers
pub use assembler::{Advisory, SendCheck};

// Data types
pub use types::{
    CreatedToken, NewToken, PurchaseQuote, TokenHolding, TokenMetadataInfo, TransactionRecord,
    TransferReceipt,
};
