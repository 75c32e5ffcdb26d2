// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
  Development,
  Test,
  Production,
}

impl Environment {
  fn parse(raw: &str) -> Result<Self> {
    match raw.to_ascii_lowercase().as_str() {
      "development" | "dev" => Ok(Environment::Development),
      "test" => Ok(Environment::Test),
      "production" | "prod" => Ok(Environment::Production),
      other => Err(AppError::Config(format!("Invalid APP_ENV value: '{}'", other))),
    }
  }
}

#[derive(Clone)]
pub struct PaymentConfig {
  pub gateway_url: Option<String>,
  pub api_key: Option<String>,
  pub merchant_id: Option<String>,
  pub timeout: Duration,
  pub webhook_secret: Option<String>,
  /// Use the simulated gateway. Never allowed in production.
  pub simulation: bool,
}

impl PaymentConfig {
  /// URL, API key and merchant id are all present.
  pub fn gateway_configured(&self) -> bool {
    self.gateway_url.is_some() && self.api_key.is_some() && self.merchant_id.is_some()
  }
}

// Secrets stay out of logs.
impl std::fmt::Debug for PaymentConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PaymentConfig")
      .field("gateway_url", &self.gateway_url)
      .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
      .field("merchant_id", &self.merchant_id)
      .field("timeout", &self.timeout)
      .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
      .field("simulation", &self.simulation)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,
  pub environment: Environment,
  pub run_migrations: bool,

  pub order_number_prefix: String,
  pub default_currency: String,

  pub payment: PaymentConfig,

  pub email_sender: String,
  pub admin_email: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds the configuration from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());
    let required = |var_name: &str| {
      get_env(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let parse_bool = |var_name: &str, default: bool| -> Result<bool> {
      match get_env(var_name) {
        Some(raw) => raw
          .parse::<bool>()
          .map_err(|e| AppError::Config(format!("Invalid {} value: {}", var_name, e))),
        None => Ok(default),
      }
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = required("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));
    let environment = match get_env("APP_ENV") {
      Some(raw) => Environment::parse(&raw)?,
      None => Environment::Development,
    };
    let run_migrations = parse_bool("RUN_MIGRATIONS", false)?;

    let order_number_prefix = get_env("ORDER_NUMBER_PREFIX").unwrap_or_else(|| "FR".to_string());
    let default_currency = get_env("DEFAULT_CURRENCY").unwrap_or_else(|| "MUR".to_string());

    let timeout_secs = get_env("PAYMENT_GATEWAY_TIMEOUT_SECS")
      .unwrap_or_else(|| "30".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid PAYMENT_GATEWAY_TIMEOUT_SECS: {}", e)))?;
    let payment = PaymentConfig {
      gateway_url: get_env("PAYMENT_GATEWAY_URL"),
      api_key: get_env("PAYMENT_GATEWAY_API_KEY"),
      merchant_id: get_env("PAYMENT_GATEWAY_MERCHANT_ID"),
      timeout: Duration::from_secs(timeout_secs),
      webhook_secret: get_env("PAYMENT_WEBHOOK_SECRET"),
      simulation: parse_bool("PAYMENT_SIMULATION", false)?,
    };

    if payment.simulation && environment == Environment::Production {
      return Err(AppError::Config(
        "PAYMENT_SIMULATION cannot be enabled when APP_ENV=production".to_string(),
      ));
    }
    if environment == Environment::Production && payment.webhook_secret.is_none() {
      tracing::warn!("PAYMENT_WEBHOOK_SECRET is not set; every payment webhook will be rejected.");
    }

    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|| "noreply@example.com".to_string());
    let admin_email = get_env("ADMIN_EMAIL").unwrap_or_else(|| "admin@example.com".to_string());

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      environment,
      run_migrations,
      order_number_prefix,
      default_currency,
      payment,
      email_sender,
      admin_email,
    })
  }
}
