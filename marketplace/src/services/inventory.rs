// src/services/inventory.rs

//! Stock reservation against the listing rows of an open transaction.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{AppError, StoreError};
use crate::store::StoreTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
  Reserved,
  InsufficientStock { available: i32 },
  ListingUnavailable,
}

impl Reservation {
  pub fn into_result(self, listing_id: Uuid) -> Result<(), AppError> {
    match self {
      Reservation::Reserved => Ok(()),
      Reservation::InsufficientStock { available } => Err(AppError::InsufficientStock { listing_id, available }),
      Reservation::ListingUnavailable => Err(AppError::Conflict(format!(
        "Listing {} is no longer available",
        listing_id
      ))),
    }
  }
}

/// Takes `quantity` units of `listing_id` inside `tx`.
///
/// Nothing is held beyond the transaction: rolling it back restores the stock.
pub async fn reserve(tx: &mut dyn StoreTx, listing_id: Uuid, quantity: i32) -> Result<Reservation, StoreError> {
  if tx.decrement_stock_if_available(listing_id, quantity).await? {
    debug!(%listing_id, quantity, "Stock reserved.");
    return Ok(Reservation::Reserved);
  }
  let outcome = match tx.find_listing(listing_id).await? {
    Some(listing) if listing.is_active => Reservation::InsufficientStock {
      available: listing.stock,
    },
    _ => Reservation::ListingUnavailable,
  };
  warn!(%listing_id, quantity, ?outcome, "Stock reservation refused.");
  Ok(outcome)
}
