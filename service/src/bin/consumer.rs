// basket_service/src/bin/consumer.rs

use anyhow::Context;
use basket::{retry_async, CartEngine, IntentConsumer};
use basket_service::broker::NatsQueue;
use basket_service::db::PgCartStore;
use basket_service::{telemetry, AppConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  telemetry::init_tracing();
  tracing::info!("Starting cart queue consumer...");

  let config = AppConfig::from_env().context("Failed to load application configuration")?;
  let retry = config.startup_retry_policy();
  let cfg = &config;

  let store = retry_async(&retry, "database connection", || async move {
    let store = PgCartStore::connect(cfg).await?;
    store.ensure_schema().await?;
    Ok::<_, sqlx::Error>(store)
  })
  .await
  .context("Database unavailable")?;

  let (queue, source) = retry_async(&retry, "NATS connection", || async move {
    let queue = NatsQueue::connect(&cfg.nats_url).await?;
    queue.ensure_streams().await?;
    let source = queue.intent_source().await?;
    Ok::<_, basket::CartError>((queue, source))
  })
  .await
  .context("Cart queue unavailable")?;

  let engine = CartEngine::new(Arc::new(store.clone()));
  let mut consumer = IntentConsumer::new(source, engine, Arc::new(queue), config.redelivery_policy());

  let stats = consumer
    .run_until(async {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
      }
      tracing::info!("Shutdown signal received");
    })
    .await;

  store.close().await;
  tracing::info!(?stats, "Cart queue consumer stopped.");
  Ok(())
}
