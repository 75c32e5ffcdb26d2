// src/models/payment_transaction.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::order::PaymentStatus;

/// One payment attempt at the gateway, keyed by the gateway's transaction id.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
  pub id: Uuid,
  pub order_id: Uuid,
  pub gateway_transaction_id: String,
  pub amount: Decimal,
  pub currency: String,
  pub status: PaymentStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
  pub fn pending(order_id: Uuid, gateway_transaction_id: String, amount: Decimal, currency: String) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      order_id,
      gateway_transaction_id,
      amount,
      currency,
      status: PaymentStatus::Pending,
      created_at: now,
      updated_at: now,
    }
  }
}
