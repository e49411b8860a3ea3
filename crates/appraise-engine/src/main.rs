use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use appraise_core::store::Store;
use appraise_engine::config::WarnLevel;
use appraise_engine::{ChatApi, ChatNotifier, Config, Reconciler, SourceRegistry};
use appraise_oracle::{HttpOracle, OracleConfig};

#[derive(Parser)]
#[command(
    name = "appraised",
    about = "Assessment reconciliation daemon: keeps risk decisions fresh as linked resources change",
    version
)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, env = "APPRAISE_CONFIG", default_value = "appraise.yaml")]
    config: PathBuf,

    /// Run a single scan cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(&cli.config)?;

    let mut unusable = false;
    for warning in config.validate() {
        match warning.level {
            WarnLevel::Error => {
                unusable = true;
                error!(message = %warning.message, "config error");
            }
            WarnLevel::Warning => warn!(message = %warning.message, "config warning"),
        }
    }
    if unusable {
        anyhow::bail!("configuration is unusable, see log for details");
    }

    let store = Arc::new(Store::open(&config.store.path)?);
    let oracle = Arc::new(HttpOracle::new(OracleConfig {
        model: config.oracle.model.clone(),
        base_url: config.oracle.base_url.clone(),
        ..OracleConfig::default()
    })?);
    let chat = Arc::new(ChatApi::from_env(config.chat.base_url.clone())?);
    let sources = Arc::new(SourceRegistry::with_defaults(chat.clone()));
    let sink = Arc::new(ChatNotifier::new(chat));

    let token = CancellationToken::new();
    let reconciler = Reconciler::new(store, sources, oracle, sink, &config, token.clone());

    if cli.once {
        let summary = reconciler.scan().await?;
        info!(
            scanned = summary.scanned,
            updated = summary.updated,
            failed = summary.failed,
            "scan complete"
        );
        return Ok(());
    }

    let worker = tokio::spawn(reconciler.run());

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    token.cancel();

    let timeout = config.scan.shutdown_timeout();
    match tokio::time::timeout(timeout, worker).await {
        Ok(_) => info!("reconciliation loop stopped"),
        Err(_) => warn!(
            timeout = ?timeout,
            "reconciliation loop did not stop in time, exiting anyway"
        ),
    }
    Ok(())
}
