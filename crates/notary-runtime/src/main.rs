//! `notary`: anchor document digests on an Ethereum-compatible ledger.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dl_01_canonicalizer::hash_file;
use dl_03_document_registry::{RegistryError, Verification};
use dl_05_block_monitor::StartPoint;
use notary_runtime::config::{parse_gas_price, NotaryConfig};
use notary_runtime::telemetry::init_tracing;
use notary_runtime::{Access, Notary};
use shared_types::{decode_hex, parse_address, parse_hash, to_prefixed_hex, TransactionReceipt};
use tracing::{error, info};
use zeroize::Zeroizing;

/// Document integrity notary
#[derive(Parser, Debug)]
#[command(name = "notary", version)]
#[command(about = "Register and verify document digests on a ledger")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Flags override the environment.
#[derive(Args, Debug)]
struct Overrides {
    /// JSON-RPC endpoint
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Signing key as 32 bytes of hex
    #[arg(long, global = true, hide = true)]
    private_key: Option<String>,

    /// Registry contract address (overrides the contract file)
    #[arg(long, global = true)]
    contract: Option<String>,

    /// File holding the deployed contract address
    #[arg(long, global = true)]
    contract_file: Option<PathBuf>,

    /// Receipt database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Gas price in wei, or `node`
    #[arg(long, global = true)]
    gas_price: Option<String>,

    /// Seconds to wait for a receipt
    #[arg(long, global = true)]
    confirm_timeout: Option<u64>,

    /// Log filter (`info`, `debug`, ...)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy the registry contract
    Deploy {
        /// File with the contract bytecode as hex
        #[arg(long)]
        bytecode: PathBuf,
    },
    /// Register a document
    Add {
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        doc_type: String,
    },
    /// Verify a document or a registry key
    Verify {
        #[arg(required_unless_present = "key", conflicts_with = "key")]
        file: Option<PathBuf>,
        /// Hex digest instead of a file
        #[arg(long)]
        key: Option<String>,
    },
    /// Change the name and type of a registered document
    Update {
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        doc_type: String,
    },
    /// Delete a registered document
    Delete { file: PathBuf },
    /// Transaction queries
    #[command(subcommand)]
    Tx(TxCommand),
    /// List stored receipts
    Receipts {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Record receipts of new blocks until Ctrl+C
    Monitor {
        /// Start at this block instead of the current head
        #[arg(long)]
        from_block: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    /// Status from the store or the ledger
    Status { hash: String },
    /// Transaction, receipt and block details
    Details { hash: String },
    /// Fetch and store the receipt of a mined transaction
    Record { hash: String },
}

impl Command {
    fn access(&self) -> Access {
        match self {
            Command::Deploy { .. }
            | Command::Add { .. }
            | Command::Update { .. }
            | Command::Delete { .. } => Access::Signing,
            _ => Access::ReadOnly,
        }
    }
}

fn load_config(overrides: &Overrides) -> Result<NotaryConfig> {
    let mut config = NotaryConfig::from_env()?;

    if let Some(url) = &overrides.rpc_url {
        config.ledger.rpc_url = url.clone();
    }
    if let Some(key) = &overrides.private_key {
        config.signer.private_key = Some(Zeroizing::new(key.clone()));
    }
    if let Some(contract) = &overrides.contract {
        config.registry.contract_address =
            Some(parse_address(contract).context("invalid --contract")?);
    }
    if let Some(path) = &overrides.contract_file {
        config.registry.contract_file = path.clone();
    }
    if let Some(path) = &overrides.db {
        config.store.db_path = path.clone();
    }
    if let Some(price) = &overrides.gas_price {
        config.gas.price = parse_gas_price(price)?;
    }
    if let Some(secs) = overrides.confirm_timeout {
        config.confirmation.timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(level) = &overrides.log_level {
        config.telemetry.log_level = level.clone();
    }
    if overrides.json_logs {
        config.telemetry.json_logs = true;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli.overrides)?;
    init_tracing(&config.telemetry)?;

    let notary = Notary::connect(config, cli.command.access()).await?;
    match run(&notary, cli.command).await {
        Ok(code) => Ok(code),
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "Command failed");
            Err(e)
        }
    }
}

async fn run(notary: &Notary, command: Command) -> Result<ExitCode> {
    match command {
        Command::Deploy { bytecode } => {
            let text = std::fs::read_to_string(&bytecode)
                .with_context(|| format!("reading {}", bytecode.display()))?;
            let code = decode_hex(text.trim()).context("bytecode is not hex")?;
            let address = notary.deploy(code).await?;
            println!("Registry deployed at {}", to_prefixed_hex(&address));
        }
        Command::Add {
            file,
            name,
            doc_type,
        } => {
            let digest = hash_file(&file)?;
            let outcome = notary
                .registry()?
                .add_digest(digest, &name, &doc_type)
                .await;
            return report_write("Registered", &file, outcome);
        }
        Command::Verify { file, key } => {
            let registry = notary.registry()?;
            let verification = match key {
                Some(key) => registry.verify_by_key(&key).await?,
                None => {
                    let file = file.context("a file or --key is required")?;
                    registry.verify_digest(hash_file(&file)?).await?
                }
            };
            print_verification(&verification);
            if !verification.matched {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Update {
            file,
            name,
            doc_type,
        } => {
            let digest = hash_file(&file)?;
            let outcome = notary
                .registry()?
                .update_digest(digest, &name, &doc_type)
                .await;
            return report_write("Updated", &file, outcome);
        }
        Command::Delete { file } => {
            let digest = hash_file(&file)?;
            let outcome = notary.registry()?.delete_digest(digest).await;
            return report_write("Deleted", &file, outcome);
        }
        Command::Tx(query) => run_tx(notary, query).await?,
        Command::Receipts { limit } => {
            let receipts = notary.tracker().receipts(limit)?;
            if receipts.is_empty() {
                println!("No receipts stored");
            }
            for receipt in &receipts {
                print_receipt(receipt);
            }
        }
        Command::Monitor { from_block } => {
            let start = from_block.map_or(StartPoint::Latest, StartPoint::Block);
            let handle = notary.monitor(start).spawn();
            info!("Monitoring blocks. Press Ctrl+C to stop.");
            tokio::signal::ctrl_c().await?;
            let monitor = handle.shutdown().await?;
            match monitor.watermark() {
                Some(block) => println!("Stopped after block #{}", block),
                None => println!("Stopped before any block was processed"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_tx(notary: &Notary, query: TxCommand) -> Result<()> {
    let tracker = notary.tracker();
    match query {
        TxCommand::Status { hash } => {
            let tx_hash = parse_hash(&hash).context("invalid transaction hash")?;
            println!("{}", tracker.status(&tx_hash).await?);
        }
        TxCommand::Details { hash } => {
            let tx_hash = parse_hash(&hash).context("invalid transaction hash")?;
            println!("{}", tracker.details(&tx_hash).await?);
        }
        TxCommand::Record { hash } => {
            let tx_hash = parse_hash(&hash).context("invalid transaction hash")?;
            let (receipt, inserted) = tracker.record(&tx_hash).await?;
            print_receipt(&receipt);
            if !inserted {
                println!("(already stored)");
            }
        }
    }
    Ok(())
}

/// Contract rejections are expected outcomes and exit with code 3.
fn report_write(
    action: &str,
    file: &Path,
    outcome: Result<TransactionReceipt, RegistryError>,
) -> Result<ExitCode> {
    match outcome {
        Ok(receipt) => {
            println!("{} {}", action, file.display());
            print_receipt(&receipt);
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ (RegistryError::AlreadyExists { .. } | RegistryError::NotFound { .. })) => {
            println!("{}", e);
            Ok(ExitCode::from(3))
        }
        Err(e) => Err(e.into()),
    }
}

fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn print_receipt(receipt: &TransactionReceipt) {
    println!(
        "{}  {:<7}  block #{:<8} gas {:<8} {}",
        receipt.tx_hash_hex(),
        receipt.status.as_str(),
        receipt.block_number,
        receipt.gas_used,
        format_timestamp(receipt.block_timestamp)
    );
}

fn print_verification(verification: &Verification) {
    println!("Digest:   {}", verification.digest.to_prefixed_hex());
    match &verification.record {
        Some(record) => {
            let state = if verification.matched {
                "VERIFIED"
            } else {
                "DELETED"
            };
            println!("Status:   {}", state);
            println!("Issuer:   {}", to_prefixed_hex(&record.issuer));
            println!("Name:     {}", record.name);
            println!("Type:     {}", record.doc_type);
            println!("Added:    {}", format_timestamp(record.registered_at));
        }
        None => println!("Status:   NOT REGISTERED"),
    }
}
