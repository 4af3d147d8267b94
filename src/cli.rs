use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pag: command-line Solana wallet.
#[derive(Parser, Debug)]
#[command(name = "pag", version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Solana JSON-RPC endpoint (overrides PAG_RPC_URL)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Authentication backend base URL (overrides PAG_BACKEND_URL)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Session file (overrides PAG_SESSION_FILE)
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a wallet from a new recovery phrase and register it
    Create,

    /// Recover a registered wallet from its phrase and set a new password
    Recover,

    /// Log in with username and password
    Login(LoginArgs),

    /// Invalidate the session and remove it from this machine
    Logout,

    /// Show the username of the active session
    Whoami,

    /// Show the wallet's public key
    Address,

    /// Show the SOL balance
    Balance,

    /// List token holdings with their metadata
    Assets(AssetsArgs),

    /// Send SOL
    Send(SendArgs),

    /// Send a fungible token
    SendToken(SendTokenArgs),

    /// Buy whole SOL at the current price (devnet airdrop)
    Buy(BuyArgs),

    /// Mint a new Token-2022 token with on-chain metadata
    CreateToken(CreateTokenArgs),

    /// Show recent transfers
    History(HistoryArgs),
}

/// Arguments for the `login` subcommand.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    pub username: String,
}

/// Arguments for the `assets` subcommand.
#[derive(Parser, Debug)]
pub struct AssetsArgs {
    /// Output as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `send` subcommand.
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Recipient address (base58)
    pub recipient: String,

    /// Amount in SOL (at least 0.01)
    pub amount: String,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

/// Arguments for the `send-token` subcommand.
#[derive(Parser, Debug)]
pub struct SendTokenArgs {
    /// Mint address of the token to send
    pub mint: String,

    /// Recipient wallet address (base58)
    pub recipient: String,

    /// Amount in whole tokens (at least 0.01)
    pub amount: String,

    #[arg(long, short)]
    pub yes: bool,
}

/// Arguments for the `buy` subcommand.
#[derive(Parser, Debug)]
pub struct BuyArgs {
    /// Whole number of SOL to buy
    pub sol: String,

    #[arg(long, short)]
    pub yes: bool,
}

/// Arguments for the `create-token` subcommand.
#[derive(Parser, Debug)]
pub struct CreateTokenArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub symbol: String,

    /// Stored as the `description` metadata field
    #[arg(long, default_value = "")]
    pub description: String,

    /// Initial supply in whole tokens, minted to this wallet
    #[arg(long)]
    pub supply: String,
}

/// Arguments for the `history` subcommand.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Number of recent signatures to resolve (1 to 1000)
    #[arg(long, value_parser = parse_limit)]
    pub limit: Option<usize>,

    /// Natural-language search over the listed transfers (needs GEMINI_API_KEY)
    #[arg(long, conflicts_with = "filter")]
    pub search: Option<String>,

    /// Keep transfers whose sender or recipient contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Output as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

fn parse_limit(value: &str) -> Result<usize, String> {
    let limit: usize = value.parse().map_err(|e| format!("{value:?}: {e}"))?;
    pagwallet::history::check_history_limit(limit).map_err(|e| e.to_string())
}
