use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;

use multichain_fee_tracker::{
    api,
    chains::{defaults::default_chains, file::load_chain_file, ChainRegistry},
    cli::Cli,
    config::Config,
    error::AppError,
    fetch_meta::FetchMeta,
    gas::ProviderSettings,
    logging::init_logging,
    metrics::AppMetrics,
    orchestrator::{OrchestratorSettings, SnapshotOrchestrator},
    price::PriceGatherer,
    scheduler,
    services::http::HttpClient,
    state::AppState,
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run().await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::from_env().map_err(AppError::Config)?.apply_cli(&cli);
    tracing::info!("Service starting with config: {:?}", redacted(&config));

    let chain_configs = match &config.chains_file {
        Some(path) => load_chain_file(path)?,
        None => default_chains(),
    };

    let fetch_meta = FetchMeta::new(config.fetch_meta_ttl);
    let http = HttpClient::new(config.provider_timeout, fetch_meta.clone());

    let provider_settings = ProviderSettings {
        per_call_timeout: config.provider_timeout,
        total_timeout: config.provider_total_timeout,
        etherscan_api_key: config.etherscan_api_key.clone(),
    };
    let registry = ChainRegistry::new(chain_configs, http.clone(), provider_settings)?;
    tracing::info!("Tracking {} chains: {}", registry.len(), registry.keys().collect::<Vec<_>>().join(", "));

    let prices = PriceGatherer::with_default_sources(
        http,
        config.coingecko_api_key.clone(),
        config.provider_timeout,
    );
    tracing::info!("Pricing from {} USD sources", prices.source_count());

    let orchestrator = Arc::new(SnapshotOrchestrator::new(
        Arc::new(registry),
        Arc::new(prices),
        OrchestratorSettings {
            l1_chain_key: config.l1_chain_key.clone(),
            l1_timeout: config.provider_total_timeout,
            chain_build_timeout: config.chain_build_timeout,
        },
    ));

    if cli.once {
        let snapshot = orchestrator.generate_snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot).map_err(|err| AppError::Parse(err.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    let metrics = Arc::new(AppMetrics::new().map_err(|err| AppError::Unknown(err.to_string()))?);
    let state = AppState::new(orchestrator, metrics, fetch_meta, config.snapshot_cache_ttl);

    let poller = tokio::spawn(scheduler::run_snapshot_polling(
        state.clone(),
        config.poll_interval_seconds,
    ));

    let addr = format!("0.0.0.0:{}", config.api_port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| AppError::Network(format!("failed to bind {}: {}", addr, err)))?;
    tracing::info!("API listening on {}", addr);

    axum::serve(listener, api::create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|err| AppError::Network(err.to_string()))?;

    let _ = poller.await;
    tracing::info!("Service stopped");
    Ok(())
}

/// Config for logging, with API keys masked.
fn redacted(config: &Config) -> Config {
    let mask = |key: &Option<String>| key.as_ref().map(|_| "***".to_string());
    Config {
        etherscan_api_key: mask(&config.etherscan_api_key),
        coingecko_api_key: mask(&config.coingecko_api_key),
        ..config.clone()
    }
}
