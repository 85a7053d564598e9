use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use yieldtrail::cache::summary_cache_for;
use yieldtrail::{
    api, config::Config, db::init_db, Analyzer, DepositLedger, ExplorerDataSource,
    PositionApiClient, Repository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let ledger = Arc::new(DepositLedger::new(Arc::new(Repository::new(pool))));

    let explorer = Arc::new(ExplorerDataSource::new(
        config.explorer_api_url.clone(),
        config.token_contract.clone(),
        config.explorer_api_key.clone(),
    ));
    let positions = Arc::new(PositionApiClient::new(config.position_api_url.clone()));

    let analyzer = Arc::new(Analyzer::new(
        explorer,
        positions,
        ledger,
        summary_cache_for(config.summary_cache_ttl),
        config.classifier_context(),
        config.analysis_settings(),
    ));

    let app = api::create_router(api::AppState::new(analyzer));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        vaults = config.vaults.len(),
        fee_rate = %config.fee_rate.value(),
        cache_ttl_secs = config.summary_cache_ttl.as_secs(),
        "Server listening on {}",
        addr
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
