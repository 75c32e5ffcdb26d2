// src/services/analytics.rs

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::errors::Result as AppResult;

pub const ORDER_CREATED: &str = "order_created";
pub const PAYMENT_INITIATED: &str = "payment_initiated";
pub const PAYMENT_COMPLETED: &str = "payment_completed";
pub const PAYMENT_FAILED: &str = "payment_failed";

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
  async fn track(&self, user_id: Uuid, event_name: &str, properties: JsonValue) -> AppResult<()>;
}

/// Emits each event as a structured log line on the `analytics` target.
#[derive(Debug, Default, Clone)]
pub struct TracingAnalytics;

#[async_trait]
impl AnalyticsSink for TracingAnalytics {
  async fn track(&self, user_id: Uuid, event_name: &str, properties: JsonValue) -> AppResult<()> {
    tracing::info!(target: "analytics", %user_id, event = event_name, %properties, "Tracked event.");
    Ok(())
  }
}
