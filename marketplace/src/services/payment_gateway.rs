// src/services/payment_gateway.rs

//! Wallet payment gateway client and webhook signatures.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::PaymentConfig;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("payment gateway is not configured")]
  NotConfigured,

  #[error("payment gateway did not answer in time")]
  Timeout,

  #[error("payment gateway request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("payment gateway rejected the request with status {status}: {body}")]
  Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
  pub amount: Decimal,
  pub currency: String,
  pub order_ref: String,
  pub return_url: String,
  pub cancel_url: String,
  pub metadata: JsonValue,
}

/// What the gateway hands back for a new payment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySession {
  pub transaction_id: String,
  pub payment_url: String,
  #[serde(default)]
  pub qr_code_url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn initiate_payment(&self, request: &PaymentRequest) -> Result<GatewaySession, GatewayError>;
}

/// HTTP client for the wallet gateway. Every call has a bounded timeout and
/// is never retried.
pub struct HttpPaymentGateway {
  client: reqwest::Client,
  base_url: String,
  api_key: String,
  merchant_id: String,
}

impl HttpPaymentGateway {
  pub fn new(
    base_url: impl Into<String>,
    api_key: impl Into<String>,
    merchant_id: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, GatewayError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      api_key: api_key.into(),
      merchant_id: merchant_id.into(),
    })
  }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
  #[instrument(name = "gateway::initiate_payment", skip(self, request), fields(order_ref = %request.order_ref), err(Display))]
  async fn initiate_payment(&self, request: &PaymentRequest) -> Result<GatewaySession, GatewayError> {
    let url = format!("{}/payments/initiate", self.base_url);
    let response = self
      .client
      .post(&url)
      .header("X-API-Key", &self.api_key)
      .header("X-Merchant-ID", &self.merchant_id)
      .json(request)
      .send()
      .await
      .map_err(|e| if e.is_timeout() { GatewayError::Timeout } else { GatewayError::Http(e) })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(GatewayError::Rejected {
        status: status.as_u16(),
        body,
      });
    }

    let session = response
      .json::<GatewaySession>()
      .await
      .map_err(|e| if e.is_timeout() { GatewayError::Timeout } else { GatewayError::Http(e) })?;
    info!(transaction_id = %session.transaction_id, "Gateway payment session created.");
    Ok(session)
  }
}

/// Test double that approves every request with a `SIM-` transaction id.
/// There is no hosted payment page; the returned URL is the status endpoint
/// for the new transaction.
pub struct SimulatedGateway {
  app_base_url: String,
}

impl SimulatedGateway {
  pub fn new(app_base_url: impl Into<String>) -> Self {
    Self {
      app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
    }
  }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
  async fn initiate_payment(&self, request: &PaymentRequest) -> Result<GatewaySession, GatewayError> {
    let transaction_id = format!("SIM-{}", Uuid::new_v4().simple());
    warn!(%transaction_id, order_ref = %request.order_ref, "Simulated payment gateway in use.");
    Ok(GatewaySession {
      payment_url: format!("{}/api/v1/payments/status/{}", self.app_base_url, transaction_id),
      transaction_id,
      qr_code_url: None,
    })
  }
}

/// Stands in when no gateway is configured: every initiation fails.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
  async fn initiate_payment(&self, _request: &PaymentRequest) -> Result<GatewaySession, GatewayError> {
    Err(GatewayError::NotConfigured)
  }
}

/// Picks the gateway implementation for `config`.
///
/// Simulation wins when enabled; configuration loading already refuses it in
/// production.
pub fn build_gateway(config: &PaymentConfig, app_base_url: &str) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
  if config.simulation {
    warn!("PAYMENT_SIMULATION is enabled; payments are not real.");
    return Ok(Arc::new(SimulatedGateway::new(app_base_url)));
  }
  match (&config.gateway_url, &config.api_key, &config.merchant_id) {
    (Some(url), Some(api_key), Some(merchant_id)) => Ok(Arc::new(HttpPaymentGateway::new(
      url.as_str(),
      api_key.as_str(),
      merchant_id.as_str(),
      config.timeout,
    )?)),
    _ => {
      warn!("Payment gateway credentials not configured; wallet payments are disabled.");
      Ok(Arc::new(UnconfiguredGateway))
    }
  }
}

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign_webhook_payload(payload: &[u8], secret: &str) -> Result<String, hmac::digest::InvalidLength> {
  let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())?;
  mac.update(payload);
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex HMAC-SHA256 signature, optionally prefixed with `sha256=`,
/// in constant time.
pub fn verify_webhook_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
  let signature = signature.trim();
  let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
  let Ok(sig_bytes) = hex::decode(signature) else {
    return false;
  };
  let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
    return false;
  };
  mac.update(payload);
  mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "whsec_test";

  #[test]
  fn signature_round_trip_with_and_without_prefix() {
    let body = br#"{"gatewayTransactionId":"T1","status":"success"}"#;
    let signature = sign_webhook_payload(body, SECRET).unwrap();
    assert!(verify_webhook_signature(body, &signature, SECRET));
    assert!(verify_webhook_signature(body, &format!("sha256={}", signature), SECRET));
  }

  #[test]
  fn tampered_body_wrong_secret_and_garbage_are_rejected() {
    let body = br#"{"gatewayTransactionId":"T1","status":"success"}"#;
    let signature = sign_webhook_payload(body, SECRET).unwrap();
    assert!(!verify_webhook_signature(br#"{"gatewayTransactionId":"T1","status":"failed"}"#, &signature, SECRET));
    assert!(!verify_webhook_signature(body, &signature, "other"));
    assert!(!verify_webhook_signature(body, "not-hex", SECRET));
    assert!(!verify_webhook_signature(body, "", SECRET));
  }

  #[tokio::test]
  async fn unconfigured_gateway_refuses() {
    let request = PaymentRequest {
      amount: Decimal::new(17000, 2),
      currency: "MUR".into(),
      order_ref: "FR-2025-000001".into(),
      return_url: "http://localhost/return".into(),
      cancel_url: "http://localhost/cancel".into(),
      metadata: JsonValue::Null,
    };
    let err = UnconfiguredGateway.initiate_payment(&request).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotConfigured));

    let session = SimulatedGateway::new("http://localhost:8080/")
      .initiate_payment(&request)
      .await
      .unwrap();
    assert!(session.transaction_id.starts_with("SIM-"));
    assert_eq!(
      session.payment_url,
      format!("http://localhost:8080/api/v1/payments/status/{}", session.transaction_id)
    );
  }

  #[tokio::test]
  async fn missing_credentials_select_unconfigured_gateway() {
    let config = PaymentConfig {
      gateway_url: Some("https://gateway.example".into()),
      api_key: None,
      merchant_id: None,
      timeout: Duration::from_secs(5),
      webhook_secret: None,
      simulation: false,
    };
    let gateway = build_gateway(&config, "http://localhost:8080").unwrap();
    let request = PaymentRequest {
      amount: Decimal::new(4500, 2),
      currency: "MUR".into(),
      order_ref: "FR-2025-000002".into(),
      return_url: "http://localhost/return".into(),
      cancel_url: "http://localhost/cancel".into(),
      metadata: JsonValue::Null,
    };
    let err = gateway.initiate_payment(&request).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotConfigured));
  }
}
