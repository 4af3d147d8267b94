mod cli;
mod error;
mod output;
mod prompt;
mod wizard;

use std::io::Write;

use clap::Parser;
use cli::{Cli, Command};
use pagwallet::price::parse_whole_sol;
use pagwallet::search::filter_by_address;
use pagwallet::utils::parse_amount;
use pagwallet::{
    Advisory, AuthService, AuthWizard, GenerativeClient, NewToken, PriceClient, Wallet,
    WalletConfig, WalletError,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{CliError, Result};
use crate::prompt::Prompter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::WARN);

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv(); // load .env if present

    let cancel = setup_signal_handlers();

    let result = tokio::select! {
        r = run(cli, &cancel) => r,
        _ = cancel.cancelled() => Err(WalletError::Cancelled.into()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

/// Register SIGINT and SIGTERM handlers that trigger the returned token.
///
/// A second SIGINT exits immediately, which also ends a blocked prompt.
fn setup_signal_handlers() -> CancellationToken {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
        cancel_clone.cancel();
        let _ = tokio::signal::ctrl_c().await;
        std::process::exit(130);
    });

    #[cfg(unix)]
    {
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("received SIGTERM, shutting down");
                    cancel_clone.cancel();
                }
                Err(e) => warn!(error = %e, "failed to register SIGTERM handler"),
            }
        });
    }

    cancel
}

/// Environment and `.env` values, overridden by command-line flags.
fn load_config(cli: &Cli) -> Result<WalletConfig> {
    let mut config = WalletConfig::from_env();
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(path) = &cli.session_file {
        config.session_path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let config = load_config(&cli)?;
    let auth = AuthService::from_config(&config)?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::Create => {
            let mut prompt = Prompter::stdio();
            let mut wizard = AuthWizard::new();
            wizard::confirm_new_phrase(&mut wizard, &mut prompt)?;
            let username = prompt.ask_required("Username")?;
            let (password, confirmation) = wizard::new_password(&mut prompt)?;
            let session = auth
                .signup(&username, &password, &confirmation, wizard.into_keypair()?)
                .await?;
            writeln!(out, "Account {username} created for {}", session.pubkey())?;
        }

        Command::Recover => {
            let mut prompt = Prompter::stdio();
            let mut wizard = AuthWizard::new();
            wizard::enter_recovery_phrase(&mut wizard, &mut prompt)?;
            auth.check_recovery(&mut wizard).await?;
            let (password, confirmation) = wizard::new_password(&mut prompt)?;
            let session = auth
                .recover(&password, &confirmation, wizard.into_keypair()?)
                .await?;
            writeln!(out, "Wallet {} recovered", session.pubkey())?;
        }

        Command::Login(args) => {
            let mut prompt = Prompter::stdio();
            let password = prompt.ask_secret("Password")?;
            let session = auth.login(&args.username, &password).await?;
            writeln!(out, "Logged in as {} ({})", args.username, session.pubkey())?;
        }

        Command::Logout => {
            auth.logout().await?;
            writeln!(out, "Logged out")?;
        }

        Command::Whoami => {
            let user = auth.current_user().await?;
            writeln!(out, "{}", user.username)?;
        }

        Command::Address => {
            let session = auth.store().require()?;
            writeln!(out, "{}", session.pubkey())?;
        }

        Command::Balance => {
            let wallet = open_wallet(&auth, config)?;
            writeln!(out, "{} SOL", wallet.balance().await?)?;
        }

        Command::Assets(args) => {
            let wallet = open_wallet(&auth, config)?;
            let holdings = wallet.token_holdings(cancel).await?;
            if args.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&holdings)?)?;
            } else {
                output::write_holdings(&mut out, &holdings)?;
            }
        }

        Command::Send(args) => {
            let wallet = open_wallet(&auth, config)?;
            let check = wallet.prepare_send_sol(&args.amount, &args.recipient).await?;
            let summary = format!("Send {} SOL to {}?", check.amount, check.recipient);
            confirm_send(&summary, &check.advisories, args.yes)?;
            let receipt = wallet.send_sol(&check).await?;
            writeln!(out, "{}", receipt.signature)?;
            writeln!(out, "{}", output::explorer_url(&receipt.signature))?;
        }

        Command::SendToken(args) => {
            let wallet = open_wallet(&auth, config)?;
            let (holding, check) = wallet
                .prepare_send_token(&args.mint, &args.amount, &args.recipient, cancel)
                .await?;
            let label = if holding.symbol.is_empty() {
                holding.mint.clone()
            } else {
                holding.symbol.clone()
            };
            let summary = format!("Send {} {label} to {}?", check.amount, check.recipient);
            confirm_send(&summary, &check.advisories, args.yes)?;
            let receipt = wallet.send_token(&check, &holding).await?;
            writeln!(out, "{}", receipt.signature)?;
            writeln!(out, "{}", output::explorer_url(&receipt.signature))?;
        }

        Command::Buy(args) => {
            let sol = parse_whole_sol(&args.sol)?;
            let wallet = open_wallet(&auth, config)?;
            match PriceClient::from_config(wallet.config())?.quote(sol).await {
                Ok(quote) => output::write_quote(&mut std::io::stderr(), &quote)?,
                Err(e) => warn!(error = %e, "price quote unavailable"),
            }
            if !args.yes && !Prompter::stdio().confirm(&format!("Buy {sol} SOL?"))? {
                return Err(CliError::Aborted);
            }
            let receipt = wallet.airdrop(sol).await?;
            writeln!(out, "{}", receipt.signature)?;
        }

        Command::CreateToken(args) => {
            let supply = parse_amount(&args.supply)?;
            let wallet = open_wallet(&auth, config)?;
            let created = wallet
                .create_token(&NewToken {
                    name: args.name,
                    symbol: args.symbol,
                    description: args.description,
                    supply,
                })
                .await?;
            writeln!(out, "mint:          {}", created.mint)?;
            writeln!(out, "token account: {}", created.token_account)?;
            writeln!(out, "signature:     {}", created.signature)?;
        }

        Command::History(args) => {
            let wallet = open_wallet(&auth, config)?;
            let mut records = wallet.history(args.limit, cancel).await?;
            if let Some(query) = args.search.as_deref() {
                let client = GenerativeClient::from_config(wallet.config())?;
                records = client.search(&records, query).await?;
            } else if let Some(term) = args.filter.as_deref() {
                records = filter_by_address(&records, term);
            }
            if args.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
            } else {
                output::write_history(&mut out, &records)?;
            }
        }
    }

    Ok(())
}

/// The wallet for the stored session.
fn open_wallet(auth: &AuthService, config: WalletConfig) -> Result<Wallet> {
    let session = auth.store().require()?;
    info!(wallet = %session.pubkey(), rpc = %config.rpc_url, "wallet opened");
    Ok(Wallet::connect(config, session))
}

/// Show advisories and ask before submitting, unless `yes` was given.
fn confirm_send(summary: &str, advisories: &[Advisory], yes: bool) -> Result<()> {
    output::write_advisories(&mut std::io::stderr(), advisories)?;
    if yes || Prompter::stdio().confirm(summary)? {
        Ok(())
    } else {
        Err(CliError::Aborted)
    }
}
