// src/pipelines/payment_initiation_pipeline.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use workflow::{ContextData, Pipeline, PipelineControl, PipelineResult, StepMode, Workflows};

use crate::errors::{AppError, Result as AppResult, StoreError};
use crate::models::{PaymentMethod, PaymentStatus, PaymentTransaction};
use crate::pipelines::common_steps::best_effort;
use crate::pipelines::contexts::PaymentInitiationCtxData;
use crate::services::analytics;
use crate::services::payment_gateway::PaymentRequest;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
  pub order_id: Uuid,
  #[serde(default)]
  pub amount: Option<Decimal>,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(default)]
  pub return_url: Option<String>,
  #[serde(default)]
  pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiation {
  pub transaction_id: String,
  pub payment_url: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub qr_code: Option<String>,
  pub status: PaymentStatus,
}

pub fn register_payment_initiation_pipeline(workflows: &Workflows<AppError>) {
  let mut p = Pipeline::<PaymentInitiationCtxData, AppError>::new(&[
    ("load_payable_order", StepMode::Required, None),
    ("request_gateway_session", StepMode::Required, None),
    ("record_transaction", StepMode::Required, None),
    ("track_payment_initiated", StepMode::Detached, None),
  ]);

  p.on_step("load_payable_order", load_payable_order);
  p.on_step("request_gateway_session", request_gateway_session);
  p.on_step("record_transaction", record_transaction);
  p.on_step("track_payment_initiated", track_payment_initiated);

  workflows.register(p);
}

async fn load_payable_order(ctx_data: ContextData<PaymentInitiationCtxData>) -> AppResult<PipelineControl> {
  let (store, order_id, user_id, requested_amount) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      guard.order_id,
      guard.user_id,
      guard.requested_amount,
    )
  };

  let order = store
    .find_order(order_id)
    .await?
    .filter(|order| order.user_id == user_id)
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

  if order.payment_method != PaymentMethod::GatewayWallet {
    return Err(AppError::Validation(
      "Order was not placed with wallet payment".to_string(),
    ));
  }
  if order.payment_status != PaymentStatus::Pending {
    return Err(AppError::Conflict(format!(
      "Order {} payment is already {}",
      order.order_number, order.payment_status
    )));
  }
  if let Some(amount) = requested_amount {
    if amount != order.total_amount {
      return Err(AppError::Validation(format!(
        "Amount {} does not match order total {}",
        amount, order.total_amount
      )));
    }
  }

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "step::request_gateway_session", skip(ctx_data), err(Display))]
async fn request_gateway_session(ctx_data: ContextData<PaymentInitiationCtxData>) -> AppResult<PipelineControl> {
  let (gateway, request) = {
    let guard = ctx_data.read();
    let order = guard
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order not loaded before gateway call".to_string()))?;
    let request = PaymentRequest {
      amount: order.total_amount,
      currency: guard.currency.clone(),
      order_ref: order.order_number.clone(),
      return_url: guard.return_url.clone(),
      cancel_url: guard.cancel_url.clone(),
      metadata: json!({ "orderId": order.id, "orderNumber": order.order_number }),
    };
    (guard.app_state.gateway.clone(), request)
  };

  // One attempt, bounded by the client's timeout.
  let session = gateway.initiate_payment(&request).await.map_err(|e| {
    error!(order_ref = %request.order_ref, error = %e, "Payment gateway call failed.");
    AppError::PaymentGatewayUnavailable(e.to_string())
  })?;

  ctx_data.write().session = Some(session);
  Ok(PipelineControl::Continue)
}

async fn record_transaction(ctx_data: ContextData<PaymentInitiationCtxData>) -> AppResult<PipelineControl> {
  let (store, order_id, currency, session) = {
    let guard = ctx_data.read();
    let session = guard
      .session
      .clone()
      .ok_or_else(|| AppError::Internal("No gateway session to record".to_string()))?;
    (guard.app_state.store.clone(), guard.order_id, guard.currency.clone(), session)
  };

  let mut tx = store.begin().await?;
  // Re-read under lock: a webhook may have settled the order meanwhile.
  let order = tx
    .lock_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  if order.payment_status != PaymentStatus::Pending {
    return Err(AppError::Conflict(format!(
      "Order {} payment is already {}",
      order.order_number, order.payment_status
    )));
  }
  let transaction = PaymentTransaction::pending(order.id, session.transaction_id.clone(), order.total_amount, currency);
  tx.insert_transaction(&transaction).await.map_err(|e| match e {
    StoreError::Duplicate(what) => AppError::Conflict(format!("Gateway returned a reused transaction id ({})", what)),
    other => AppError::Store(other),
  })?;
  tx.commit().await?;

  info!(%order_id, transaction_id = %transaction.gateway_transaction_id, "Payment transaction recorded.");
  ctx_data.write().transaction = Some(transaction);
  Ok(PipelineControl::Continue)
}

async fn track_payment_initiated(ctx_data: ContextData<PaymentInitiationCtxData>) -> AppResult<PipelineControl> {
  let (app_state, user_id, transaction) = {
    let guard = ctx_data.read();
    (guard.app_state.clone(), guard.user_id, guard.transaction.clone())
  };
  let Some(transaction) = transaction else {
    warn!("Payment initiation finished without a transaction; nothing to track.");
    return Ok(PipelineControl::Continue);
  };
  let properties = json!({
    "orderId": transaction.order_id,
    "transactionId": transaction.gateway_transaction_id,
    "amount": transaction.amount,
    "currency": transaction.currency,
  });
  best_effort(
    "analytics:payment_initiated",
    transaction.order_id,
    app_state.analytics.track(user_id, analytics::PAYMENT_INITIATED, properties),
  )
  .await
}

/// Opens a wallet payment for one of the caller's orders.
#[instrument(
  name = "workflow::initiate_payment",
  skip(app_state, request),
  fields(user_id = %user_id, order_id = %request.order_id),
  err(Display)
)]
pub async fn initiate_payment(
  app_state: &AppState,
  user_id: Uuid,
  request: InitiatePaymentRequest,
) -> AppResult<PaymentInitiation> {
  let base_url = app_state.config.app_base_url.trim_end_matches('/').to_string();
  let ctx_data = ContextData::new(PaymentInitiationCtxData {
    app_state: app_state.clone(),
    user_id,
    order_id: request.order_id,
    requested_amount: request.amount,
    currency: request
      .currency
      .unwrap_or_else(|| app_state.config.default_currency.clone()),
    return_url: request
      .return_url
      .unwrap_or_else(|| format!("{}/payment/success", base_url)),
    cancel_url: request
      .cancel_url
      .unwrap_or_else(|| format!("{}/payment/cancel", base_url)),
    order: None,
    session: None,
    transaction: None,
  });

  match app_state.workflows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      match (&guard.session, &guard.transaction) {
        (Some(session), Some(transaction)) => Ok(PaymentInitiation {
          transaction_id: session.transaction_id.clone(),
          payment_url: session.payment_url.clone(),
          qr_code: session.qr_code_url.clone(),
          status: transaction.status,
        }),
        _ => Err(AppError::Internal(
          "Payment initiation completed without a transaction".to_string(),
        )),
      }
    }
    PipelineResult::Stopped => Err(AppError::Internal("Payment initiation was halted unexpectedly".to_string())),
  }
}
