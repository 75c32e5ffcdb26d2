// src/pipelines/contexts.rs

//! Context data carried through each pipeline. Every context holds a clone of
//! `AppState` so handlers can reach the store and collaborators.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{AdminAction, Listing, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, PaymentTransaction};
use crate::services::payment_gateway::GatewaySession;
use crate::state::AppState;

// --- Order placement ---

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub listing_id: Uuid,
  pub quantity: i32,
}

#[derive(Clone)]
pub struct OrderPlacementCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub payment_method: PaymentMethod,
  pub lines: Vec<CartLine>,

  // Filled in by the pipeline:
  pub listings: HashMap<Uuid, Listing>,
  pub order_id: Uuid,
  pub items: Vec<OrderItem>,
  pub total_amount: Decimal,
  pub order: Option<Order>,
}

impl OrderPlacementCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, payment_method: PaymentMethod, lines: Vec<CartLine>) -> Self {
    Self {
      app_state,
      user_id,
      payment_method,
      lines,
      listings: HashMap::new(),
      order_id: Uuid::new_v4(),
      items: Vec::new(),
      total_amount: Decimal::ZERO,
      order: None,
    }
  }
}

// --- Payment initiation ---

#[derive(Clone)]
pub struct PaymentInitiationCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub requested_amount: Option<Decimal>,
  pub currency: String,
  pub return_url: String,
  pub cancel_url: String,

  pub order: Option<Order>,
  pub session: Option<GatewaySession>,
  pub transaction: Option<PaymentTransaction>,
}

// --- Payment reconciliation ---

/// Payment status reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayPaymentStatus {
  #[serde(alias = "completed")]
  Success,
  Failed,
  Pending,
}

impl GatewayPaymentStatus {
  pub fn as_payment_status(self) -> PaymentStatus {
    match self {
      GatewayPaymentStatus::Success => PaymentStatus::Completed,
      GatewayPaymentStatus::Failed => PaymentStatus::Failed,
      GatewayPaymentStatus::Pending => PaymentStatus::Pending,
    }
  }
}

/// Body of a gateway webhook delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
  #[serde(alias = "transactionId")]
  pub gateway_transaction_id: String,
  pub status: GatewayPaymentStatus,
  pub order_id: Uuid,
  #[serde(default)]
  pub amount: Option<Decimal>,
}

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
  /// pending -> completed, order now awaiting fulfillment.
  Completed,
  /// pending -> failed.
  Failed,
  /// The ledger row settled but the order had already been settled by
  /// another transaction; the order and its side effects were left alone.
  LedgerOnly(PaymentStatus),
  /// The transaction was already terminal; nothing changed.
  AlreadyTerminal(PaymentStatus),
  /// The gateway reported `pending`; nothing changed.
  StillPending,
  /// The delivery did not match the ledger and was dropped.
  Ignored(String),
}

impl ReconcileOutcome {
  pub fn transitioned(&self) -> bool {
    matches!(self, ReconcileOutcome::Completed | ReconcileOutcome::Failed)
  }
}

#[derive(Clone)]
pub struct PaymentWebhookCtxData {
  pub app_state: AppState,
  pub raw_payload: Vec<u8>,
  pub signature_header: Option<String>,

  pub notification: Option<PaymentNotification>,
  pub outcome: Option<ReconcileOutcome>,
  pub order: Option<Order>,
}

impl PaymentWebhookCtxData {
  pub fn new(app_state: AppState, raw_payload: Vec<u8>, signature_header: Option<String>) -> Self {
    Self {
      app_state,
      raw_payload,
      signature_header,
      notification: None,
      outcome: None,
      order: None,
    }
  }
}

// --- Order status (admin) ---

#[derive(Clone)]
pub struct OrderStatusCtxData {
  pub app_state: AppState,
  pub admin_id: Uuid,
  pub order_id: Uuid,
  pub new_status: OrderStatus,
  pub notes: Option<String>,

  pub previous_status: Option<OrderStatus>,
  pub order: Option<Order>,
  pub action: Option<AdminAction>,
}
