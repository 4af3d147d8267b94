use std::path::PathBuf;
use std::time::Duration;

use solana_sdk::commitment_config::CommitmentConfig;
use url::Url;

use crate::error::{Result, WalletError};
use crate::history::check_history_limit;

/// Default number of signatures pulled for the history view.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Backoff schedule for transient RPC and HTTP failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every further attempt.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
        }
    }
}

/// Configuration for the wallet client.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Base URL of the authentication backend (e.g. `http://localhost:8000/`).
    pub backend_url: String,
    /// Solana JSON-RPC URL.
    pub rpc_url: String,
    /// Commitment used for reads and for confirming submitted transactions.
    pub commitment: CommitmentConfig,
    /// Base URL of the generative-language REST API.
    pub generative_url: String,
    /// Model name used for transaction search.
    pub generative_model: String,
    /// API key for the generative endpoint; search is unavailable without it.
    pub generative_api_key: Option<String>,
    /// Base URL of the price API used for buy quotes.
    pub price_url: String,
    /// Location of the persisted session (auth token + secret key).
    pub session_path: PathBuf,
    /// Number of recent signatures resolved for the history view.
    pub history_limit: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// How long to wait for a submitted transaction to reach `commitment`.
    pub confirm_timeout: Duration,
    pub retry: RetryPolicy,
}

impl WalletConfig {
    /// Devnet defaults with a backend on localhost.
    pub fn devnet() -> Self {
        Self {
            backend_url: "http://localhost:8000/".into(),
            rpc_url: "https://api.devnet.solana.com".into(),
            commitment: CommitmentConfig::confirmed(),
            generative_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            generative_model: "gemini-1.5-flash".into(),
            generative_api_key: None,
            price_url: "https://api.coingecko.com/api/v3".into(),
            session_path: PathBuf::from(".pag").join("session.json"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            request_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(90),
            retry: RetryPolicy::default(),
        }
    }

    /// Devnet defaults overlaid with `PAG_*` / `GEMINI_API_KEY` environment variables.
    pub fn from_env() -> Self {
        Self::devnet().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from a key lookup (environment or any other source).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PAG_BACKEND_URL") {
            self.backend_url = v;
        }
        if let Some(v) = lookup("PAG_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = lookup("PAG_SESSION_FILE") {
            self.session_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            self.generative_api_key = Some(v);
        }
        if let Some(v) = lookup("PAG_GEMINI_MODEL") {
            self.generative_model = v;
        }
        if let Some(n) = lookup("PAG_HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
            self.history_limit = n;
        }
        if let Some(secs) = lookup("PAG_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Check that every configured endpoint is a well-formed http(s) URL.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("backend_url", &self.backend_url),
            ("rpc_url", &self.rpc_url),
            ("generative_url", &self.generative_url),
            ("price_url", &self.price_url),
        ] {
            let url = Url::parse(value)
                .map_err(|e| WalletError::Validation(format!("{name} {value:?}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(WalletError::Validation(format!(
                    "{name} must be http or https, got {}",
                    url.scheme()
                )));
            }
        }
        check_history_limit(self.history_limit)?;
        Ok(())
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::devnet()
    }
}
