// src/services/order_queries.rs

//! Read side of orders and payments. None of these open a transaction.

use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderItem, PaymentTransaction};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItem>,
}

/// Who is asking. Admins see every order.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
  pub user_id: Uuid,
  pub is_admin: bool,
}

impl Viewer {
  fn can_see(&self, order: &Order) -> bool {
    self.is_admin || order.user_id == self.user_id
  }
}

async fn with_items(app_state: &AppState, orders: Vec<Order>) -> AppResult<Vec<OrderWithItems>> {
  let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
  let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
  for item in app_state.store.items_for_orders(&order_ids).await? {
    grouped.entry(item.order_id).or_default().push(item);
  }
  Ok(
    orders
      .into_iter()
      .map(|order| {
        let items = grouped.remove(&order.id).unwrap_or_default();
        OrderWithItems { order, items }
      })
      .collect(),
  )
}

#[instrument(name = "query::my_orders", skip(app_state))]
pub async fn find_my_orders(app_state: &AppState, user_id: Uuid) -> AppResult<Vec<OrderWithItems>> {
  let orders = app_state.store.orders_for_user(user_id).await?;
  with_items(app_state, orders).await
}

/// A foreign order is reported as missing, not forbidden.
#[instrument(name = "query::order", skip(app_state))]
pub async fn find_order(app_state: &AppState, order_id: Uuid, viewer: Viewer) -> AppResult<OrderWithItems> {
  let order = app_state
    .store
    .find_order(order_id)
    .await?
    .filter(|order| viewer.can_see(order))
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  let items = app_state.store.order_items(order.id).await?;
  Ok(OrderWithItems { order, items })
}

#[instrument(name = "query::all_orders", skip(app_state))]
pub async fn find_all_orders(app_state: &AppState) -> AppResult<Vec<OrderWithItems>> {
  let orders = app_state.store.all_orders().await?;
  with_items(app_state, orders).await
}

#[instrument(name = "query::payment_status", skip(app_state))]
pub async fn get_payment_status(
  app_state: &AppState,
  gateway_transaction_id: &str,
  viewer: Viewer,
) -> AppResult<PaymentTransaction> {
  let not_found = || AppError::NotFound(format!("Payment transaction {} not found", gateway_transaction_id));
  let transaction = app_state
    .store
    .find_transaction(gateway_transaction_id)
    .await?
    .ok_or_else(not_found)?;
  if !viewer.is_admin {
    let owns_order = app_state
      .store
      .find_order(transaction.order_id)
      .await?
      .map_or(false, |order| order.user_id == viewer.user_id);
    if !owns_order {
      return Err(not_found());
    }
  }
  Ok(transaction)
}
