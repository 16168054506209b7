use clap::{Parser, Subcommand};
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{normalize_address, validate_address, RpcClient};
use crate::config::AppConfig;
use crate::database::{Database, DbError};
use crate::error::{ConfigError, ProcessingError, RpcError};
use crate::ledger::LedgerStore;
use crate::models::{Account, LedgerTransactionRecord};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ProcessingError),
    #[error("{0}")]
    NotFound(String),
}

/// Operator tool for the deposit ledger
#[derive(Parser, Debug)]
#[command(name = "listener-cli", version, about = "Inspect and manage the deposit ledger")]
pub struct Cli {
    /// Ledger database path (overrides configuration)
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Manage tracked deposit accounts
    #[command(subcommand)]
    Account(AccountCommand),
    /// Inspect ledger transaction records
    #[command(subcommand)]
    Tx(TxCommand),
    /// Query the node for an address's on-chain balance
    ChainBalance {
        address: String,
    },
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum AccountCommand {
    /// Start tracking an address
    Add {
        address: String,
        /// Account holder id in the external payment system
        #[arg(long)]
        external_id: String,
    },
    /// Show an account and its credited deposits
    Show { address: String },
    List,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TxCommand {
    Show { hash: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigCommand {
    /// Print a sample configuration file
    Sample,
}

pub struct CliHandler {
    database: Arc<Database>,
    config: AppConfig,
}

impl CliHandler {
    pub fn new(database: Arc<Database>, config: AppConfig) -> Self {
        Self { database, config }
    }

    /// Run a command and return the text to print
    pub async fn execute_command(&self, command: &Commands) -> Result<String, CliError> {
        match command {
            Commands::Account(AccountCommand::Add { address, external_id }) => {
                validate_address(address)?;
                let account = self.database.register_account(address, external_id)?;
                Ok(format!("Tracking {} (id {}, external id {})", account.address, account.id, account.external_id))
            }
            Commands::Account(AccountCommand::Show { address }) => self.show_account(address),
            Commands::Account(AccountCommand::List) => {
                let accounts = self.database.list_accounts()?;
                if accounts.is_empty() {
                    return Ok("No tracked accounts".to_string());
                }
                Ok(accounts.iter().map(format_account).collect::<Vec<_>>().join("\n"))
            }
            Commands::Tx(TxCommand::Show { hash }) => match self.database.transaction_record_by_hash(hash) {
                Ok(record) => Ok(format_record(&record)),
                Err(DbError::NotFound) => Err(CliError::NotFound(format!("No ledger record for {}", hash))),
                Err(e) => Err(e.into()),
            },
            Commands::ChainBalance { address } => {
                let rpc = RpcClient::new(
                    self.config.node.http_endpoint.clone(),
                    self.config.node.request_timeout_seconds,
                )?;
                let balance = rpc.get_balance(&normalize_address(address)).await?;
                Ok(format!("{} holds {} wei on chain", normalize_address(address), balance))
            }
            Commands::Config(ConfigCommand::Sample) => Ok(AppConfig::generate_sample_config()?),
        }
    }

    fn show_account(&self, address: &str) -> Result<String, CliError> {
        let account = self
            .database
            .find_account(address)?
            .ok_or_else(|| CliError::NotFound(format!("{} is not tracked", normalize_address(address))))?;

        let records = self.database.ledger_records_for_account(account.id)?;

        let mut lines = vec![format_account(&account)];
        if records.is_empty() {
            lines.push("  no credited deposits".to_string());
        }
        lines.extend(records.iter().map(|record| format!("  {}", format_record(record))));
        Ok(lines.join("\n"))
    }
}

fn format_account(account: &Account) -> String {
    format!(
        "#{} {} balance={} wei external_id={}",
        account.id, account.address, account.balance, account.external_id
    )
}

fn format_record(record: &LedgerTransactionRecord) -> String {
    let created = chrono::DateTime::<chrono::Utc>::from_timestamp(record.created_at, 0)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| record.created_at.to_string());

    format!(
        "{} {} confirmed={} confirmations={} account={} at {}",
        record.tx_hash, record.direction, record.confirmed, record.confirmation_count, record.account_id, created
    )
}
