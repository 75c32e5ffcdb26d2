// src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use marketplace::config::AppConfig;
use marketplace::services::analytics::TracingAnalytics;
use marketplace::services::notifications::MockEmailSender;
use marketplace::services::payment_gateway::build_gateway;
use marketplace::state::AppState;
use marketplace::store::PgStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting marketplace server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(e.into());
    }
  };

  let db_pool = PgPoolOptions::new()
    .max_connections(10)
    .connect(&app_config.database_url)
    .await
    .map_err(|e| {
      tracing::error!(error = %e, "Failed to connect to the database.");
      e
    })?;
  tracing::info!("Successfully connected to the database.");

  let store = PgStore::new(db_pool);
  if app_config.run_migrations {
    store.migrate().await?;
    tracing::info!("Database migrations applied.");
  }

  let gateway = build_gateway(&app_config.payment, &app_config.app_base_url)?;
  let notifier = Arc::new(MockEmailSender::new(
    app_config.email_sender.clone(),
    app_config.admin_email.clone(),
  ));

  let app_state = AppState::new(
    app_config.clone(),
    Arc::new(store),
    gateway,
    notifier,
    Arc::new(TracingAnalytics),
  );

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(marketplace::web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  Ok(())
}
