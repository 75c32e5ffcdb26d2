// tests/order_status_tests.rs
mod common;

use common::TestApp;
use marketplace::errors::AppError;
use marketplace::models::{admin_action, OrderStatus, PaymentMethod};
use marketplace::pipelines::{update_order_status, UpdateOrderStatusRequest};
use marketplace::store::MarketplaceStore;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn to(status: OrderStatus) -> UpdateOrderStatusRequest {
  UpdateOrderStatusRequest { status, notes: None }
}

async fn cod_order(app: &TestApp) -> Uuid {
  let listing_id = app.seed_listing("Chair", dec!(75.00), 5).await;
  app
    .place(Uuid::new_v4(), PaymentMethod::CashOnDelivery, &[(listing_id, 1)])
    .await
    .unwrap()
    .order
    .id
}

#[tokio::test]
async fn test_fulfillment_path_is_audited() {
  let app = TestApp::new();
  let admin_id = Uuid::new_v4();
  let order_id = cod_order(&app).await;

  for status in [
    OrderStatus::AwaitingFulfillment,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
  ] {
    let order = update_order_status(&app.state, admin_id, order_id, to(status))
      .await
      .unwrap();
    assert_eq!(order.order_status, status);
  }

  assert_eq!(app.order(order_id).await.order_status, OrderStatus::Delivered);
  let actions = app.store.admin_actions_for_order(order_id).await.unwrap();
  assert_eq!(actions.len(), 4);
  assert!(actions.iter().all(|a| a.admin_id == admin_id));
  assert!(actions.iter().all(|a| a.action_type == admin_action::ORDER_STATUS_UPDATED));
  assert_eq!(actions[0].notes.as_deref(), Some("Status changed to awaiting_fulfillment"));
  assert_eq!(actions[3].notes.as_deref(), Some("Status changed to delivered"));
}

#[tokio::test]
async fn test_admin_notes_are_kept_and_blank_notes_defaulted() {
  let app = TestApp::new();
  let admin_id = Uuid::new_v4();
  let order_id = cod_order(&app).await;

  update_order_status(
    &app.state,
    admin_id,
    order_id,
    UpdateOrderStatusRequest {
      status: OrderStatus::Cancelled,
      notes: Some("Customer called to cancel".to_string()),
    },
  )
  .await
  .unwrap();

  let other = cod_order(&app).await;
  update_order_status(
    &app.state,
    admin_id,
    other,
    UpdateOrderStatusRequest {
      status: OrderStatus::Cancelled,
      notes: Some("   ".to_string()),
    },
  )
  .await
  .unwrap();

  let first = app.store.admin_actions_for_order(order_id).await.unwrap();
  assert_eq!(first[0].notes.as_deref(), Some("Customer called to cancel"));
  let second = app.store.admin_actions_for_order(other).await.unwrap();
  assert_eq!(second[0].notes.as_deref(), Some("Status changed to cancelled"));
}

#[tokio::test]
async fn test_illegal_transition_conflicts_without_audit() {
  let app = TestApp::new();
  let order_id = cod_order(&app).await;

  let skipped = update_order_status(&app.state, Uuid::new_v4(), order_id, to(OrderStatus::Shipped)).await;
  assert!(matches!(skipped, Err(AppError::Conflict(_))), "got {:?}", skipped);

  update_order_status(&app.state, Uuid::new_v4(), order_id, to(OrderStatus::Cancelled))
    .await
    .unwrap();
  let revived = update_order_status(&app.state, Uuid::new_v4(), order_id, to(OrderStatus::Processing)).await;
  assert!(matches!(revived, Err(AppError::Conflict(_))));

  let same = update_order_status(&app.state, Uuid::new_v4(), order_id, to(OrderStatus::Cancelled)).await;
  assert!(matches!(same, Err(AppError::Conflict(_))));

  assert_eq!(app.order(order_id).await.order_status, OrderStatus::Cancelled);
  assert_eq!(app.store.admin_actions_for_order(order_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
  let app = TestApp::new();
  let result = update_order_status(
    &app.state,
    Uuid::new_v4(),
    Uuid::new_v4(),
    to(OrderStatus::AwaitingFulfillment),
  )
  .await;
  assert!(matches!(result, Err(AppError::NotFound(_))));
}
