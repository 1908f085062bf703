use anyhow::Result;
use briefing_agent::{pipeline, telemetry, AgentConfig, PriceConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AgentConfig::<PriceConfig>::from_env()?;
    tracing::info!("Ingesting prices for {:?}", config.assets);

    let ledger = config.store.connect().await?;
    let client = config.flow.client();

    pipeline::ingest_prices(&client, &ledger, &config.assets).await;
    Ok(())
}
