// src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use uuid::Uuid;

/// Fulfillment lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  AwaitingFulfillment,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::AwaitingFulfillment => "awaiting_fulfillment",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  /// Whether an administrator may move an order from `self` to `next`.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, AwaitingFulfillment)
        | (Pending, Cancelled)
        | (AwaitingFulfillment, Processing)
        | (AwaitingFulfillment, Cancelled)
        | (Processing, Shipped)
        | (Processing, Cancelled)
        | (Shipped, Delivered)
    )
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Payment state of an order, shared by payment transactions.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
}

impl PaymentStatus {
  pub fn is_terminal(self) -> bool {
    !matches!(self, PaymentStatus::Pending)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Completed => "completed",
      PaymentStatus::Failed => "failed",
    }
  }
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  CashOnDelivery,
  GatewayWallet,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Uuid,
  pub payment_method: PaymentMethod,
  pub total_amount: Decimal,
  pub order_status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// `PREFIX-YEAR-NNNNNN`, the sequence zero padded to six digits.
pub fn format_order_number(prefix: &str, year: i32, sequence: i64) -> String {
  format!("{}-{}-{:06}", prefix, year, sequence)
}
