// src/models/listing.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A sellable listing. `stock` only changes through a reservation inside an
/// order placement transaction.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
  pub id: Uuid,
  pub title: String,
  pub price: Decimal,
  pub stock: i32,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Listing {
  pub fn new(title: impl Into<String>, price: Decimal, stock: i32) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      title: title.into(),
      price,
      stock,
      is_active: true,
      created_at: now,
      updated_at: now,
    }
  }
}
