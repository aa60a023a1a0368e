//! Anchorage - document verification and ledger anchoring service

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anchorage::anchor::gateway::AnchoringGateway;
use anchorage::anchor::poller::ConfirmationPoller;
use anchorage::config::Args;
use anchorage::db::Db;
use anchorage::ledger::horizon::HorizonClient;
use anchorage::ledger::keys::SecretStore;
use anchorage::ledger::LedgerClient;
use anchorage::routes::{app, AppState};
use anchorage::workflow::WorkflowEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("anchorage={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Anchorage - ledger anchoring service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Database: {}", args.database_path.display());
    info!("Testnet horizon: {}", args.testnet_horizon_url);
    info!("Mainnet horizon: {}", args.mainnet_horizon_url);
    info!("Base fee: {} (max {})", args.base_fee, args.max_fee);
    info!(
        "Confirmation: poll every {}ms, give up after {}s",
        args.poll_interval_ms, args.confirmation_timeout_secs
    );
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("======================================");

    let secret_key = match args.secret_store_key_bytes() {
        Ok(key) => key,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Wire components explicitly: store -> gateway -> poller, engine
    // alongside on the same store
    let db = Arc::new(Db::open(&args.database_path)?);
    let networks = Arc::new(args.ledger_config());
    let ledger: Arc<dyn LedgerClient> = Arc::new(HorizonClient::new(
        networks.as_ref().clone(),
        args.submit_timeout(),
    )?);

    let engine = Arc::new(WorkflowEngine::new(db.clone()));
    let gateway = Arc::new(AnchoringGateway::new(
        db.clone(),
        ledger.clone(),
        networks,
        SecretStore::new(secret_key),
        args.fee_limits(),
    ));
    let poller = Arc::new(ConfirmationPoller::new(
        db.clone(),
        ledger.clone(),
        args.poller_config(),
    ));

    let state = AppState {
        engine,
        gateway,
        poller,
        ledger,
    };

    let router = app(state);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("Listening on http://{}", args.listen);
    axum::serve(listener, router).await?;

    Ok(())
}
