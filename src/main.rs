use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use containers::{ClientConfig, Coder, JsonCoder, KeccakMerkleVerifier};
use ledger::RocksKeyValueStore;
use light_client::wallet::LocalWallet;
use light_client::LightClient;
use metrics::server::{run_metrics_server, MetricsServerConfig};
use metrics::Metrics;
use networking::{Collaborators, HttpAggregator, RpcCommitmentContract};
use tokio::task;
use tracing::{error, info};

#[derive(Parser, Debug)]
struct Args {
    /// Client configuration (YAML).
    #[arg(short, long)]
    config: PathBuf,

    /// File holding the hex-encoded secp256k1 private key.
    #[arg(short, long)]
    key_file: PathBuf,

    /// Ledger directory. Overrides `data_dir` from the configuration.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    metrics: bool,

    #[arg(long, default_value = "127.0.0.1")]
    metrics_address: IpAddr,

    #[arg(long, default_value_t = 5054)]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::load_from_file(&args.config)
        .map_err(|err| anyhow!("failed to load config {}: {err}", args.config.display()))?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    let wallet =
        LocalWallet::load_from_file(&args.key_file).context("failed to load wallet key")?;
    let store = RocksKeyValueStore::open(&config.data_dir)
        .with_context(|| format!("failed to open ledger at {}", config.data_dir.display()))?;

    let metrics = if args.metrics {
        let metrics = Arc::new(Metrics::new()?);
        let server_config = MetricsServerConfig {
            metrics_address: args.metrics_address,
            metrics_port: args.metrics_port,
        };
        let server_metrics = metrics.clone();
        task::spawn(async move {
            if let Err(err) = run_metrics_server(server_config, server_metrics).await {
                error!(error = %err, "Metrics server exited");
            }
        });
        Some(metrics)
    } else {
        None
    };

    let coder: Arc<dyn Coder> = Arc::new(JsonCoder);
    let contract = RpcCommitmentContract::new(
        config.rpc_url.clone(),
        config.commitment_contract,
        Duration::from_millis(config.poll_interval_ms),
        coder.clone(),
    )
    .with_checkpoint_sources(config.deposit_contracts());
    let collaborators = Collaborators {
        aggregator: Arc::new(HttpAggregator::new(
            config.aggregator_url.clone(),
            coder.clone(),
        )),
        contract: Arc::new(contract),
        verifier: Arc::new(KeccakMerkleVerifier),
        coder,
    };

    let client = Arc::new(LightClient::new(
        Arc::new(wallet),
        config,
        Arc::new(store),
        collaborators,
        metrics,
    ));

    let events = client.start().await.context("initial sync failed")?;
    for balance in client.balance().await? {
        info!(
            token = %balance.token,
            deposit_contract = %balance.deposit_contract,
            amount = %balance.amount,
            "Balance"
        );
    }

    let client_handle = task::spawn({
        let client = client.clone();
        async move { client.run(events).await }
    });

    tokio::select! {
        _ = client_handle => {
            info!("Contract subscription ended.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down.");
        }
    }

    Ok(())
}
