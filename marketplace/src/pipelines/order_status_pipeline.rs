// src/pipelines/order_status_pipeline.rs

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use workflow::{ContextData, Pipeline, PipelineControl, PipelineResult, StepMode, Workflows};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{admin_action, AdminAction, Order, OrderStatus};
use crate::pipelines::contexts::OrderStatusCtxData;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
  pub status: OrderStatus,
  #[serde(default)]
  pub notes: Option<String>,
}

pub fn register_order_status_pipeline(workflows: &Workflows<AppError>) {
  let mut p = Pipeline::<OrderStatusCtxData, AppError>::new(&[("apply_status_change", StepMode::Required, None)]);

  p.on_step("apply_status_change", apply_status_change);
  p.after_step("apply_status_change", |ctx_data: ContextData<OrderStatusCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      info!(
        admin_id = %guard.admin_id,
        order_id = %guard.order_id,
        from = ?guard.previous_status,
        to = %guard.new_status,
        "Order status changed by admin."
      );
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  workflows.register(p);
}

#[instrument(name = "step::apply_status_change", skip(ctx_data), err(Display))]
async fn apply_status_change(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (store, admin_id, order_id, new_status, notes) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      guard.admin_id,
      guard.order_id,
      guard.new_status,
      guard.notes.clone(),
    )
  };

  let mut tx = store.begin().await?;
  let mut order = tx
    .lock_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  let previous_status = order.order_status;
  if !previous_status.can_transition_to(new_status) {
    warn!(%order_id, from = %previous_status, to = %new_status, "Illegal order status transition refused.");
    return Err(AppError::Conflict(format!(
      "Cannot change order status from {} to {}",
      previous_status, new_status
    )));
  }

  tx.set_order_status(order_id, new_status).await?;
  let action = AdminAction {
    id: Uuid::new_v4(),
    admin_id,
    order_id,
    action_type: admin_action::ORDER_STATUS_UPDATED.to_string(),
    notes: Some(notes.unwrap_or_else(|| format!("Status changed to {}", new_status))),
    created_at: Utc::now(),
  };
  tx.record_admin_action(&action).await?;
  tx.commit().await?;

  order.order_status = new_status;
  order.updated_at = action.created_at;
  let mut guard = ctx_data.write();
  guard.previous_status = Some(previous_status);
  guard.order = Some(order);
  guard.action = Some(action);
  Ok(PipelineControl::Continue)
}

/// Administrative status change with an audit record, under the order's row lock.
#[instrument(
  name = "workflow::update_order_status",
  skip(app_state, request),
  fields(admin_id = %admin_id, order_id = %order_id, status = %request.status),
  err(Display)
)]
pub async fn update_order_status(
  app_state: &AppState,
  admin_id: Uuid,
  order_id: Uuid,
  request: UpdateOrderStatusRequest,
) -> AppResult<Order> {
  let ctx_data = ContextData::new(OrderStatusCtxData {
    app_state: app_state.clone(),
    admin_id,
    order_id,
    new_status: request.status,
    notes: request.notes.filter(|n| !n.trim().is_empty()),
    previous_status: None,
    order: None,
    action: None,
  });

  match app_state.workflows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => ctx_data
      .read()
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Status change completed without an order".to_string())),
    PipelineResult::Stopped => Err(AppError::Internal("Status change was halted unexpectedly".to_string())),
  }
}
