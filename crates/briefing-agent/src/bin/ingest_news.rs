use anyhow::Result;
use briefing_agent::{pipeline, telemetry, AgentConfig, NewsConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AgentConfig::<NewsConfig>::from_env()?;
    tracing::info!(
        "Ingesting news for {:?} (page size {}, min mentions {})",
        config.assets,
        config.flow.page_size,
        config.flow.min_mentions
    );

    let ledger = config.store.connect().await?;
    let client = config.flow.client();

    pipeline::ingest_news(&client, &ledger, &config.assets).await;
    Ok(())
}
