//! Terminal presentation adapter for the ballot session.
//!
//! All session logic lives in `ballot-sync`; this binary only wires the
//! adapters from flags, forwards intents, and prints the snapshot.

use anyhow::{bail, Context, Result};
use ballot_sync::{
    CandidateSnapshot, IpfsStore, JsonRpcLedger, JsonRpcWallet, SessionApi, SessionConfig,
    SessionService,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ballot-cli", about = "Wallet-driven client for an on-chain candidate ballot")]
struct Cli {
    /// Ledger JSON-RPC endpoint.
    #[arg(long, default_value = "http://localhost:8545")]
    rpc_url: String,

    /// Wallet provider JSON-RPC endpoint (defaults to the ledger endpoint).
    #[arg(long)]
    wallet_url: Option<String>,

    /// Ballot contract address.
    #[arg(long)]
    contract: Option<String>,

    /// Blob store HTTP API endpoint.
    #[arg(long, default_value = "http://localhost:5001")]
    blob_api: String,

    /// Public gateway base URL for image links.
    #[arg(long, default_value = "https://ipfs.io")]
    gateway: String,

    /// Confirmation wait in seconds before a write counts as timed out.
    #[arg(long, default_value_t = 90)]
    confirmation_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current candidate list.
    List,
    /// Cast a vote for a candidate index.
    Vote {
        /// Candidate index from `list`.
        index: u64,
    },
    /// Register a new candidate with an image (owner only).
    Add {
        /// Candidate name.
        name: String,
        /// Path to the candidate image.
        image: PathBuf,
    },
    /// Show connection, network, and ownership status.
    Status,
}

impl Cli {
    fn to_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            ledger_rpc_url: self.rpc_url.clone(),
            wallet_rpc_url: self.wallet_url.clone().unwrap_or_else(|| self.rpc_url.clone()),
            contract_address: self
                .contract
                .clone()
                .unwrap_or(defaults.contract_address),
            blob_api_url: self.blob_api.clone(),
            gateway_base_url: self.gateway.clone(),
            confirmation_timeout_secs: self.confirmation_timeout,
            receipt_poll_ms: defaults.receipt_poll_ms,
        }
    }
}

fn print_snapshot(snapshot: &CandidateSnapshot, config: &SessionConfig) {
    if snapshot.is_empty() {
        println!("no candidates registered yet");
        return;
    }
    println!("{:>5}  {:<24} {:>7}  image", "index", "name", "votes");
    for candidate in snapshot.iter() {
        let image = candidate
            .blob_ref
            .as_ref()
            .map(|r| config.gateway_url(r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5}  {:<24} {:>7}  {}",
            candidate.index, candidate.name, candidate.vote_count, image
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();

    let session = SessionService::new(
        config.clone(),
        JsonRpcWallet::new(config.wallet_rpc_url.clone()),
        JsonRpcLedger::from_config(&config),
        IpfsStore::from_config(&config),
    );

    let account = session.connect().await.context("connecting wallet session")?;

    match cli.command {
        Command::List => {
            let snapshot = session.refresh().await?;
            print_snapshot(&snapshot, &config);
        }
        Command::Vote { index } => {
            session.refresh().await?;
            let receipt = session.cast_vote(index).await?;
            println!("vote confirmed in {}", receipt.tx_hash);
            print_snapshot(&session.snapshot().await, &config);
        }
        Command::Add { name, image } => {
            // Advisory gate only; the ledger re-checks ownership on commit.
            if !session.is_owner().await {
                bail!("connected account {account} is not the contract owner");
            }
            let bytes = std::fs::read(&image)
                .with_context(|| format!("reading image {}", image.display()))?;
            session.refresh().await?;
            let blob_ref = session.add_candidate(&name, &bytes).await?;
            println!("candidate registered; image at {}", config.gateway_url(&blob_ref));
            print_snapshot(&session.snapshot().await, &config);
        }
        Command::Status => {
            let network = session.network().await?;
            let snapshot = session.refresh().await?;
            println!("account:    {account}");
            println!("network:    {network}");
            println!("owner:      {}", session.is_owner().await);
            println!("candidates: {}", snapshot.len());
        }
    }

    Ok(())
}
