// src/models/admin_action.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const ORDER_STATUS_UPDATED: &str = "order_status_updated";

/// Audit record written in the same transaction as an administrative change.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
  pub id: Uuid,
  pub admin_id: Uuid,
  pub order_id: Uuid,
  pub action_type: String,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
}
