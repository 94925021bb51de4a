//! keykeeper: manage custody wallets, their accounts, and account rekeys.

mod commands;
mod config;

use clap::{Args, Parser, Subcommand};
use keykeeper_utils::{init_logging, LogFormat};
use std::path::PathBuf;

use crate::config::KeykeeperConfig;

#[derive(Parser)]
#[command(name = "keykeeper", version, about = "Manage custody wallets, accounts and rekeys")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "KEYKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the custody daemon.
    #[arg(long, env = "KEYKEEPER_CUSTODY_URL")]
    custody_url: Option<String>,

    #[arg(long, env = "KEYKEEPER_CUSTODY_TOKEN", hide_env_values = true)]
    custody_token: Option<String>,

    /// Base URL of the ledger node.
    #[arg(long, env = "KEYKEEPER_LEDGER_URL")]
    ledger_url: Option<String>,

    #[arg(long, env = "KEYKEEPER_LEDGER_TOKEN", hide_env_values = true)]
    ledger_token: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "KEYKEEPER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "KEYKEEPER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create, inspect, back up and recover wallets.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Manage the accounts inside a wallet.
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Move an account's signing authority to another address and back.
    Rekey {
        #[command(subcommand)]
        action: RekeyAction,
    },
}

#[derive(Args)]
struct Password {
    /// Wallet password.
    #[arg(long, env = "KEYKEEPER_WALLET_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args)]
struct Unlock {
    /// Wallet name.
    #[arg(long, short)]
    wallet: String,

    #[command(flatten)]
    password: Password,
}

#[derive(Subcommand)]
enum WalletAction {
    /// List all wallets.
    List,
    /// Show one wallet.
    Get { name: String },
    /// Create a wallet.
    Create {
        name: String,
        #[command(flatten)]
        password: Password,
    },
    /// Create a wallet from a backup phrase.
    Recover {
        name: String,
        #[command(flatten)]
        password: Password,
        /// The 25-word backup phrase, quoted.
        #[arg(long)]
        phrase: String,
    },
    /// Print a wallet's backup phrase.
    ExportBackup {
        name: String,
        #[command(flatten)]
        password: Password,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// List a wallet's accounts.
    List {
        #[command(flatten)]
        unlock: Unlock,
    },
    /// Create accounts.
    Create {
        #[command(flatten)]
        unlock: Unlock,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Delete accounts. Addresses the wallet does not hold are ignored.
    Delete {
        #[command(flatten)]
        unlock: Unlock,
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Print an account's private key as a phrase.
    Export {
        #[command(flatten)]
        unlock: Unlock,
        address: String,
    },
}

#[derive(Subcommand)]
enum RekeyAction {
    /// Show the address authorized to sign for an account.
    AuthAddr { address: String },
    /// Rekey `from` so that `to` signs for it.
    To {
        #[command(flatten)]
        unlock: Unlock,
        from: String,
        to: String,
        /// Refuse if `from` is already rekeyed to a different address.
        #[arg(long)]
        require_rekey_back: bool,
    },
    /// Restore an account's authority to itself.
    Back {
        #[command(flatten)]
        unlock: Unlock,
        account: String,
    },
}

impl Cli {
    /// File settings (or defaults) with flags and env vars on top.
    fn resolve_config(&self) -> anyhow::Result<KeykeeperConfig> {
        let mut config = match &self.config {
            Some(path) => KeykeeperConfig::from_toml_file(path)?,
            None => KeykeeperConfig::default(),
        };
        if let Some(url) = &self.custody_url {
            config.custody_url = url.clone();
        }
        if let Some(token) = &self.custody_token {
            config.custody_token = token.clone();
        }
        if let Some(url) = &self.ledger_url {
            config.ledger_url = url.clone();
        }
        if let Some(token) = &self.ledger_token {
            config.ledger_token = token.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "loaded config file");
    }

    commands::run(cli.command, &config).await
}
