// src/models/order_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A line of an order. `unit_price` is the listing price at placement time.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub listing_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub subtotal: Decimal,
}

impl OrderItem {
  pub fn priced(order_id: Uuid, listing_id: Uuid, quantity: i32, unit_price: Decimal) -> Self {
    Self {
      id: Uuid::new_v4(),
      order_id,
      listing_id,
      quantity,
      unit_price,
      subtotal: unit_price * Decimal::from(quantity),
    }
  }
}
