// src/pipelines/payment_webhook_pipeline.rs

use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use workflow::{ContextData, Pipeline, PipelineControl, PipelineResult, StepMode, Workflows};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderStatus, PaymentStatus};
use crate::pipelines::common_steps::best_effort;
use crate::pipelines::contexts::{PaymentNotification, PaymentWebhookCtxData, ReconcileOutcome};
use crate::services::analytics;
use crate::services::payment_gateway::verify_webhook_signature;
use crate::state::AppState;

fn outcome_is(ctx_data: &ContextData<PaymentWebhookCtxData>, expected: &ReconcileOutcome) -> bool {
  ctx_data.read().outcome.as_ref() == Some(expected)
}

pub fn register_payment_webhook_pipeline(workflows: &Workflows<AppError>) {
  let mut p = Pipeline::<PaymentWebhookCtxData, AppError>::new(&[
    ("verify_signature", StepMode::Required, None),
    ("parse_notification", StepMode::Required, None),
    ("apply_transition", StepMode::Required, None),
    (
      "notify_payment_completed",
      StepMode::Detached,
      Some(Arc::new(|ctx: ContextData<PaymentWebhookCtxData>| {
        !outcome_is(&ctx, &ReconcileOutcome::Completed)
      })),
    ),
    (
      "track_payment_outcome",
      StepMode::Detached,
      Some(Arc::new(|ctx: ContextData<PaymentWebhookCtxData>| {
        !ctx.read().outcome.as_ref().map_or(false, ReconcileOutcome::transitioned)
      })),
    ),
  ]);

  p.on_step("verify_signature", verify_signature);
  p.on_step("parse_notification", parse_notification);
  p.on_step("apply_transition", apply_transition);
  p.on_step("notify_payment_completed", notify_payment_completed);
  p.on_step("track_payment_outcome", track_payment_outcome);

  workflows.register(p);
}

/// Runs before anything reads or writes state.
async fn verify_signature(ctx_data: ContextData<PaymentWebhookCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let Some(secret) = guard.app_state.config.payment.webhook_secret.as_deref() else {
    warn!("Webhook received but PAYMENT_WEBHOOK_SECRET is not configured; rejecting.");
    return Err(AppError::InvalidSignature);
  };
  let Some(signature) = guard.signature_header.as_deref() else {
    warn!("Webhook received without a signature header.");
    return Err(AppError::InvalidSignature);
  };
  if !verify_webhook_signature(&guard.raw_payload, signature, secret) {
    warn!(payload_bytes = guard.raw_payload.len(), "Webhook signature mismatch.");
    return Err(AppError::InvalidSignature);
  }
  Ok(PipelineControl::Continue)
}

async fn parse_notification(ctx_data: ContextData<PaymentWebhookCtxData>) -> AppResult<PipelineControl> {
  let parsed = serde_json::from_slice::<PaymentNotification>(&ctx_data.read().raw_payload);
  let notification = parsed.map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?;
  info!(
    transaction_id = %notification.gateway_transaction_id,
    order_id = %notification.order_id,
    status = ?notification.status,
    "Payment webhook received."
  );
  ctx_data.write().notification = Some(notification);
  Ok(PipelineControl::Continue)
}

/// One transaction with the ledger row locked first, so concurrent
/// deliveries for the same gateway id apply at most one transition.
#[instrument(name = "step::apply_transition", skip(ctx_data), err(Display))]
async fn apply_transition(ctx_data: ContextData<PaymentWebhookCtxData>) -> AppResult<PipelineControl> {
  let (store, notification) = {
    let guard = ctx_data.read();
    let notification = guard
      .notification
      .clone()
      .ok_or_else(|| AppError::Internal("Webhook notification was not parsed".to_string()))?;
    (guard.app_state.store.clone(), notification)
  };
  let txn_id = notification.gateway_transaction_id.as_str();

  let mut tx = store.begin().await?;
  let Some(transaction) = tx.lock_transaction(txn_id).await? else {
    warn!(transaction_id = txn_id, "Webhook for unknown payment transaction ignored.");
    ctx_data.write().outcome = Some(ReconcileOutcome::Ignored("unknown transaction".to_string()));
    return Ok(PipelineControl::Continue);
  };
  if transaction.order_id != notification.order_id {
    warn!(
      transaction_id = txn_id,
      ledger_order_id = %transaction.order_id,
      webhook_order_id = %notification.order_id,
      "Webhook order does not match the payment transaction; ignored."
    );
    ctx_data.write().outcome = Some(ReconcileOutcome::Ignored("order mismatch".to_string()));
    return Ok(PipelineControl::Continue);
  }
  if let Some(amount) = notification.amount {
    if amount != transaction.amount {
      warn!(
        transaction_id = txn_id,
        ledger_amount = %transaction.amount,
        webhook_amount = %amount,
        "Webhook amount does not match the payment transaction; ignored."
      );
      ctx_data.write().outcome = Some(ReconcileOutcome::Ignored("amount mismatch".to_string()));
      return Ok(PipelineControl::Continue);
    }
  }
  if transaction.status.is_terminal() {
    info!(transaction_id = txn_id, status = %transaction.status, "Duplicate or late webhook; already settled.");
    ctx_data.write().outcome = Some(ReconcileOutcome::AlreadyTerminal(transaction.status));
    return Ok(PipelineControl::Continue);
  }

  let new_status = notification.status.as_payment_status();
  if new_status == PaymentStatus::Pending {
    ctx_data.write().outcome = Some(ReconcileOutcome::StillPending);
    return Ok(PipelineControl::Continue);
  }

  tx.set_transaction_status(transaction.id, new_status).await?;
  let mut order = tx
    .lock_order(transaction.order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", transaction.order_id)))?;
  let outcome = if order.payment_status != PaymentStatus::Pending {
    warn!(
      order_id = %order.id,
      payment_status = %order.payment_status,
      "Order payment already settled by another transaction; only the ledger row was updated."
    );
    ReconcileOutcome::LedgerOnly(new_status)
  } else {
    tx.set_payment_status(order.id, new_status).await?;
    order.payment_status = new_status;
    if new_status == PaymentStatus::Completed && order.order_status == OrderStatus::Pending {
      tx.set_order_status(order.id, OrderStatus::AwaitingFulfillment).await?;
      order.order_status = OrderStatus::AwaitingFulfillment;
    }
    if new_status == PaymentStatus::Completed {
      ReconcileOutcome::Completed
    } else {
      ReconcileOutcome::Failed
    }
  };
  tx.commit().await?;

  info!(transaction_id = txn_id, order_id = %order.id, ?outcome, "Payment reconciled.");
  let mut guard = ctx_data.write();
  guard.outcome = Some(outcome);
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn notify_payment_completed(ctx_data: ContextData<PaymentWebhookCtxData>) -> AppResult<PipelineControl> {
  let (app_state, order) = {
    let guard = ctx_data.read();
    (guard.app_state.clone(), guard.order.clone())
  };
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };
  best_effort(
    "email:payment_completed",
    order.id,
    app_state.notifier.notify_payment_completed(&order),
  )
  .await
}

async fn track_payment_outcome(ctx_data: ContextData<PaymentWebhookCtxData>) -> AppResult<PipelineControl> {
  let (app_state, order, notification, outcome) = {
    let guard = ctx_data.read();
    (
      guard.app_state.clone(),
      guard.order.clone(),
      guard.notification.clone(),
      guard.outcome.clone(),
    )
  };
  let (Some(order), Some(notification)) = (order, notification) else {
    return Ok(PipelineControl::Continue);
  };
  let (event, kind) = match outcome {
    Some(ReconcileOutcome::Completed) => (analytics::PAYMENT_COMPLETED, "analytics:payment_completed"),
    _ => (analytics::PAYMENT_FAILED, "analytics:payment_failed"),
  };
  let properties = json!({
    "orderId": order.id,
    "orderNumber": order.order_number,
    "transactionId": notification.gateway_transaction_id,
    "amount": order.total_amount,
  });
  best_effort(kind, order.id, app_state.analytics.track(order.user_id, event, properties)).await
}

/// Applies one gateway webhook delivery. Safe to repeat: duplicates and late
/// deliveries are acknowledged without changing anything.
#[instrument(
  name = "workflow::reconcile_payment",
  skip(app_state, raw_payload, signature_header),
  fields(payload_bytes = raw_payload.len()),
  err(Display)
)]
pub async fn reconcile_payment(
  app_state: &AppState,
  raw_payload: Vec<u8>,
  signature_header: Option<String>,
) -> AppResult<ReconcileOutcome> {
  let ctx_data = ContextData::new(PaymentWebhookCtxData::new(app_state.clone(), raw_payload, signature_header));

  match app_state.workflows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => ctx_data
      .read()
      .outcome
      .clone()
      .ok_or_else(|| AppError::Internal("Webhook processed without an outcome".to_string())),
    PipelineResult::Stopped => Err(AppError::Internal("Webhook processing was halted unexpectedly".to_string())),
  }
}
