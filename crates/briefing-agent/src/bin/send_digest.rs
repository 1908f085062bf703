use anyhow::{Context, Result};
use briefing_agent::{pipeline, telemetry, AgentConfig, DigestConfig, DigestOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AgentConfig::<DigestConfig>::from_env()?;
    tracing::info!(
        "Composing digest for {:?} with {}",
        config.assets,
        config.flow.chat.model
    );

    let ledger = config.store.connect().await?;
    let summarizer = config.flow.summarizer();
    let notifier = config.flow.notifier();

    let outcome = pipeline::send_digest(
        &ledger,
        &summarizer,
        &notifier,
        &config.assets,
        chrono::Utc::now(),
    )
    .await
    .context("Reading latest facts failed")?;

    // Delivery failures and missing data are logged by the pipeline and do
    // not change the exit code.
    if let DigestOutcome::Sent(digest) = outcome {
        tracing::info!("Delivered to {} channel(s): {}", notifier.channel_count(), digest.subject);
    }
    Ok(())
}
