// basket_service/src/bin/api.rs

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use basket::retry_async;
use basket_service::broker::NatsQueue;
use basket_service::db::PgCartStore;
use basket_service::web::configure_app_routes;
use basket_service::{telemetry, AppConfig, AppState};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  telemetry::init_tracing();
  tracing::info!("Starting cart API gateway...");

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

  let queue = retry_async(&retry, "NATS connection", || async move {
    let queue = NatsQueue::connect(&cfg.nats_url).await?;
    queue.ensure_streams().await?;
    Ok::<_, basket::CartError>(queue)
  })
  .await
  .context("Cart queue unavailable")?;

  let app_state = AppState::new(Arc::new(store.clone()), Arc::new(queue));
  let server_address = config.server_address();
  tracing::info!("Server starting at http://{}", server_address);

  HttpServer::new(move || {
    App::new()
      .wrap(TracingLogger::default())
      .app_data(web::Data::new(app_state.clone()))
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind server to {}", server_address))?
  .run()
  .await?;

  store.close().await;
  tracing::info!("Cart API gateway stopped.");
  Ok(())
}
