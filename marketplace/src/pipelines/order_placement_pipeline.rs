// src/pipelines/order_placement_pipeline.rs

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use workflow::{ContextData, Pipeline, PipelineControl, PipelineResult, StepMode, Workflows};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{format_order_number, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
use crate::pipelines::common_steps::best_effort;
use crate::pipelines::contexts::{CartLine, OrderPlacementCtxData};
use crate::services::{analytics, inventory};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
  pub items: Vec<CartLine>,
  pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
  pub order: Order,
  pub items: Vec<OrderItem>,
}

pub fn register_order_placement_pipeline(workflows: &Workflows<AppError>) {
  let mut p = Pipeline::<OrderPlacementCtxData, AppError>::new(&[
    ("validate_cart", StepMode::Required, None),
    ("load_listings", StepMode::Required, None),
    ("check_stock", StepMode::Required, None),
    ("price_order", StepMode::Required, None),
    ("persist_order", StepMode::Required, None),
    ("track_order_created", StepMode::Detached, None),
    ("notify_order_placed", StepMode::Detached, None),
  ]);

  p.on_step("validate_cart", validate_cart);
  p.on_step("load_listings", load_listings);
  p.on_step("check_stock", check_stock);
  p.on_step("price_order", price_order);
  p.on_step("persist_order", persist_order);
  p.on_step("track_order_created", track_order_created);
  p.on_step("notify_order_placed", notify_order_placed);

  workflows.register(p);
}

async fn validate_cart(ctx_data: ContextData<OrderPlacementCtxData>) -> AppResult<PipelineControl> {
  let lines = ctx_data.read().lines.clone();
  if lines.is_empty() {
    return Err(AppError::Validation("Order must contain at least one item".to_string()));
  }
  let mut seen = HashSet::with_capacity(lines.len());
  for line in &lines {
    if line.quantity < 1 {
      return Err(AppError::Validation(format!(
        "Quantity for listing {} must be at least 1",
        line.listing_id
      )));
    }
    if !seen.insert(line.listing_id) {
      return Err(AppError::Validation(format!(
        "Listing {} appears more than once in the order",
        line.listing_id
      )));
    }
  }
  Ok(PipelineControl::Continue)
}

async fn load_listings(ctx_data: ContextData<OrderPlacementCtxData>) -> AppResult<PipelineControl> {
  let (store, ids) = {
    let guard = ctx_data.read();
    let ids: Vec<Uuid> = guard.lines.iter().map(|l| l.listing_id).collect();
    (guard.app_state.store.clone(), ids)
  };

  let listings = store.active_listings_by_ids(&ids).await?;
  if listings.len() != ids.len() {
    warn!(requested = ids.len(), found = listings.len(), "Cart references unknown or inactive listings.");
    return Err(AppError::NotFound("One or more listings not found or inactive".to_string()));
  }

  ctx_data.write().listings = listings.into_iter().map(|l| (l.id, l)).collect();
  Ok(PipelineControl::Continue)
}

/// Early, precise rejection. The conditional decrement in `persist_order` is
/// what actually guards stock.
async fn check_stock(ctx_data: ContextData<OrderPlacementCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  for line in &guard.lines {
    let listing = guard
      .listings
      .get(&line.listing_id)
      .ok_or_else(|| AppError::NotFound(format!("Listing {} not found", line.listing_id)))?;
    if listing.stock < line.quantity {
      return Err(AppError::InsufficientStock {
        listing_id: listing.id,
        available: listing.stock,
      });
    }
  }
  Ok(PipelineControl::Continue)
}

async fn price_order(ctx_data: ContextData<OrderPlacementCtxData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let order_id = guard.order_id;
  let mut items = Vec::with_capacity(guard.lines.len());
  for line in &guard.lines {
    let listing = guard
      .listings
      .get(&line.listing_id)
      .ok_or_else(|| AppError::NotFound(format!("Listing {} not found", line.listing_id)))?;
    items.push(OrderItem::priced(order_id, listing.id, line.quantity, listing.price));
  }
  guard.total_amount = items.iter().map(|item| item.subtotal).sum::<Decimal>();
  guard.items = items;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "step::persist_order", skip(ctx_data), err(Display))]
async fn persist_order(ctx_data: ContextData<OrderPlacementCtxData>) -> AppResult<PipelineControl> {
  let (app_state, order_id, user_id, payment_method, items, total_amount) = {
    let guard = ctx_data.read();
    (
      guard.app_state.clone(),
      guard.order_id,
      guard.user_id,
      guard.payment_method,
      guard.items.clone(),
      guard.total_amount,
    )
  };

  let now = Utc::now();
  let mut tx = app_state.store.begin().await?;
  let sequence = tx.next_order_sequence(now.year()).await?;
  let order = Order {
    id: order_id,
    order_number: format_order_number(&app_state.config.order_number_prefix, now.year(), sequence),
    user_id,
    payment_method,
    total_amount,
    order_status: OrderStatus::Pending,
    payment_status: PaymentStatus::Pending,
    created_at: now,
    updated_at: now,
  };
  tx.insert_order(&order).await?;
  tx.insert_order_items(&items).await?;
  for item in &items {
    // An early return drops `tx`, which rolls everything back.
    inventory::reserve(tx.as_mut(), item.listing_id, item.quantity)
      .await?
      .into_result(item.listing_id)?;
  }
  tx.commit().await?;

  info!(%order_id, order_number = %order.order_number, total = %order.total_amount, "Order placed.");
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn track_order_created(ctx_data: ContextData<OrderPlacementCtxData>) -> AppResult<PipelineControl> {
  let (app_state, order, item_count) = {
    let guard = ctx_data.read();
    (guard.app_state.clone(), guard.order.clone(), guard.items.len())
  };
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };
  let properties = json!({
    "orderId": order.id,
    "orderNumber": order.order_number,
    "totalAmount": order.total_amount,
    "paymentMethod": order.payment_method,
    "itemCount": item_count,
  });
  best_effort(
    "analytics:order_created",
    order.id,
    app_state.analytics.track(order.user_id, analytics::ORDER_CREATED, properties),
  )
  .await
}

async fn notify_order_placed(ctx_data: ContextData<OrderPlacementCtxData>) -> AppResult<PipelineControl> {
  let (app_state, order, items) = {
    let guard = ctx_data.read();
    (guard.app_state.clone(), guard.order.clone(), guard.items.clone())
  };
  let Some(order) = order else {
    return Ok(PipelineControl::Continue);
  };
  best_effort(
    "email:order_placed",
    order.id,
    app_state.notifier.notify_order_placed(&order, &items),
  )
  .await
}

/// Places an order for `user_id`: validation, stock pre-check, one
/// transaction for order, items and reservations, then detached
/// notifications.
#[instrument(
  name = "workflow::place_order",
  skip(app_state, request),
  fields(user_id = %user_id, lines = request.items.len()),
  err(Display)
)]
pub async fn place_order(app_state: &AppState, user_id: Uuid, request: PlaceOrderRequest) -> AppResult<PlacedOrder> {
  let ctx_data = ContextData::new(OrderPlacementCtxData::new(
    app_state.clone(),
    user_id,
    request.payment_method,
    request.items,
  ));

  match app_state.workflows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Order placement completed without an order".to_string()))?;
      Ok(PlacedOrder {
        order,
        items: guard.items.clone(),
      })
    }
    PipelineResult::Stopped => Err(AppError::Internal("Order placement was halted unexpectedly".to_string())),
  }
}
