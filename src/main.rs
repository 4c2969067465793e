//! Lending Agent CLI
//!
//! Command-line interface for managing money market positions.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use lending_agent::wallet::SecureWallet;
use lending_agent::{Command, Config, LendingRunner, Result, RpcChainClient};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lending-agent")]
#[command(about = "Automation agent for Compound-style money markets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "lending.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and verify the configured markets
    Markets,

    /// Enter every market and approve every underlying asset
    Bootstrap,

    /// Show the account snapshot and risk parameters of a market
    Status {
        /// Market symbol, e.g. vBNB
        #[arg(short, long)]
        market: String,
    },

    /// Supply assets to a market
    Deposit {
        /// Market symbol, e.g. vBNB
        #[arg(short, long)]
        market: String,

        /// Amount in the underlying's smallest unit (wei for BNB)
        #[arg(short, long)]
        amount: U256,
    },

    /// Redeem the entire market token balance
    Withdraw {
        #[arg(short, long)]
        market: String,
    },

    /// Borrow up to half of the collateral limit
    BorrowSafe {
        #[arg(short, long)]
        market: String,
    },

    /// Repay the entire outstanding debt
    Repay {
        #[arg(short, long)]
        market: String,
    },

    /// Deposit, borrow safely, repay and withdraw in one run
    Cycle {
        #[arg(short, long)]
        market: String,

        #[arg(short, long)]
        amount: U256,
    },

    /// Show the loaded configuration (signing key redacted)
    ShowConfig,

    /// Print a starter configuration for Venus on BNB Smart Chain
    ExampleConfig,
}

impl Commands {
    fn into_command(self) -> Option<Command> {
        let command = match self {
            Commands::Markets => Command::Markets,
            Commands::Bootstrap => Command::Bootstrap,
            Commands::Status { market } => Command::Status { market },
            Commands::Deposit { market, amount } => Command::Deposit { market, amount },
            Commands::Withdraw { market } => Command::Withdraw { market },
            Commands::BorrowSafe { market } => Command::BorrowSafe { market },
            Commands::Repay { market } => Command::Repay { market },
            Commands::Cycle { market, amount } => Command::Cycle { market, amount },
            Commands::ShowConfig | Commands::ExampleConfig => return None,
        };
        Some(command)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(cli.json_logs.then(|| fmt::layer().json()))
        .with((!cli.json_logs).then(|| fmt::layer()))
        .with(filter)
        .init();

    if let Commands::ExampleConfig = cli.command {
        println!("{}", serde_json::to_string_pretty(&Config::example())?);
        return Ok(());
    }

    let config = Config::load(&cli.config)?;

    let Some(command) = cli.command.into_command() else {
        println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        return Ok(());
    };

    match run(config, command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(tx_hash) = e.pending_tx_hash() {
                tracing::error!(
                    error = %e,
                    %tx_hash,
                    "Command failed after a transaction was submitted; it may still confirm"
                );
            } else {
                tracing::error!(error = %e, "Command failed");
            }
            Err(e)
        }
    }
}

async fn run(config: Config, command: Command) -> Result<()> {
    let rpc = config.rpc()?;
    tracing::debug!(source = ?rpc.source(), "Resolved RPC endpoint");
    let wallet = SecureWallet::from_secret(&config.signing_key()?)?;
    wallet.ensure_address(config.account_address)?;

    tracing::info!(
        account = %wallet.address(),
        comptroller = %config.comptroller,
        markets = config.markets.len(),
        "Starting lending agent"
    );

    let client = Arc::new(RpcChainClient::connect(
        rpc.url().clone(),
        &wallet,
        config.confirmations,
    ));
    let runner = LendingRunner::new(&config, client);

    let output = runner.run(command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
