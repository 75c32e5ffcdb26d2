// src/pipelines/mod.rs

//! Defines and registers the pipelines behind every business operation.

use crate::errors::AppError;
use workflow::Workflows;

pub mod common_steps;
pub mod contexts;

pub mod order_placement_pipeline;
pub mod order_status_pipeline;
pub mod payment_initiation_pipeline;
pub mod payment_webhook_pipeline;

pub use order_placement_pipeline::{place_order, PlaceOrderRequest, PlacedOrder};
pub use order_status_pipeline::{update_order_status, UpdateOrderStatusRequest};
pub use payment_initiation_pipeline::{initiate_payment, InitiatePaymentRequest, PaymentInitiation};
pub use payment_webhook_pipeline::reconcile_payment;

/// Registers all pipelines. Called once when `AppState` is built.
pub fn register_all_pipelines(workflows: &Workflows<AppError>) {
  tracing::info!("Registering pipelines...");

  order_placement_pipeline::register_order_placement_pipeline(workflows);
  payment_initiation_pipeline::register_payment_initiation_pipeline(workflows);
  payment_webhook_pipeline::register_payment_webhook_pipeline(workflows);
  order_status_pipeline::register_order_status_pipeline(workflows);

  tracing::info!("All application pipelines registered.");
}
