// src/store/memory.rs

//! In-process store for tests and local demos.
//!
//! A transaction takes the single async mutex for its whole lifetime and works
//! on a staged copy of the tables; `commit` swaps the copy in, dropping the
//! handle discards it. Reads made through [`MarketplaceStore`] wait for any
//! open transaction, so a caller must not issue them while holding a
//! [`StoreTx`] on the same task.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{MarketplaceStore, StoreTx};
use crate::errors::StoreError;
use crate::models::{AdminAction, Listing, Order, OrderItem, OrderStatus, PaymentStatus, PaymentTransaction};

#[derive(Debug, Default, Clone)]
struct Tables {
  listings: HashMap<Uuid, Listing>,
  orders: HashMap<Uuid, Order>,
  order_items: Vec<OrderItem>,
  // Keyed by gateway transaction id.
  transactions: HashMap<String, PaymentTransaction>,
  admin_actions: Vec<AdminAction>,
  sequences: HashMap<i32, i64>,
}

impl Tables {
  fn order_mut(&mut self, order_id: Uuid) -> Result<&mut Order, StoreError> {
    self
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| StoreError::Unavailable(format!("order {} does not exist", order_id)))
  }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
  orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.order_number.cmp(&a.order_number)));
  orders
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn insert_listing(&self, listing: Listing) {
    self.tables.lock().await.listings.insert(listing.id, listing);
  }

  pub async fn set_listing_active(&self, listing_id: Uuid, is_active: bool) {
    if let Some(listing) = self.tables.lock().await.listings.get_mut(&listing_id) {
      listing.is_active = is_active;
    }
  }

  pub async fn order_count(&self) -> usize {
    self.tables.lock().await.orders.len()
  }

  pub async fn order_item_count(&self) -> usize {
    self.tables.lock().await.order_items.len()
  }

  pub async fn transaction_count(&self) -> usize {
    self.tables.lock().await.transactions.len()
  }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
    let guard = self.tables.clone().lock_owned().await;
    let staged = guard.clone();
    Ok(Box::new(MemoryTx { guard, staged }))
  }

  async fn active_listings_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError> {
    let tables = self.tables.lock().await;
    Ok(
      ids
        .iter()
        .filter_map(|id| tables.listings.get(id))
        .filter(|listing| listing.is_active)
        .cloned()
        .collect(),
    )
  }

  async fn find_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, StoreError> {
    Ok(self.tables.lock().await.listings.get(&listing_id).cloned())
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    Ok(self.tables.lock().await.orders.get(&order_id).cloned())
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
    let tables = self.tables.lock().await;
    Ok(
      tables
        .order_items
        .iter()
        .filter(|item| item.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn items_for_orders(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, StoreError> {
    let tables = self.tables.lock().await;
    Ok(
      tables
        .order_items
        .iter()
        .filter(|item| order_ids.contains(&item.order_id))
        .cloned()
        .collect(),
    )
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
    let tables = self.tables.lock().await;
    let orders = tables.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
    Ok(newest_first(orders))
  }

  async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
    let tables = self.tables.lock().await;
    Ok(newest_first(tables.orders.values().cloned().collect()))
  }

  async fn find_transaction(&self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    Ok(self.tables.lock().await.transactions.get(gateway_transaction_id).cloned())
  }

  async fn admin_actions_for_order(&self, order_id: Uuid) -> Result<Vec<AdminAction>, StoreError> {
    let tables = self.tables.lock().await;
    Ok(
      tables
        .admin_actions
        .iter()
        .filter(|a| a.order_id == order_id)
        .cloned()
        .collect(),
    )
  }
}

struct MemoryTx {
  guard: OwnedMutexGuard<Tables>,
  staged: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn next_order_sequence(&mut self, year: i32) -> Result<i64, StoreError> {
    let value = self.staged.sequences.entry(year).or_insert(0);
    *value += 1;
    Ok(*value)
  }

  async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
    if self.staged.orders.values().any(|o| o.order_number == order.order_number) {
      return Err(StoreError::Duplicate(format!("order number {}", order.order_number)));
    }
    self.staged.orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<(), StoreError> {
    self.staged.order_items.extend_from_slice(items);
    Ok(())
  }

  async fn decrement_stock_if_available(&mut self, listing_id: Uuid, quantity: i32) -> Result<bool, StoreError> {
    match self.staged.listings.get_mut(&listing_id) {
      Some(listing) if listing.is_active && listing.stock >= quantity => {
        listing.stock -= quantity;
        listing.updated_at = Utc::now();
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn find_listing(&mut self, listing_id: Uuid) -> Result<Option<Listing>, StoreError> {
    Ok(self.staged.listings.get(&listing_id).cloned())
  }

  async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    Ok(self.staged.orders.get(&order_id).cloned())
  }

  async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<(), StoreError> {
    let order = self.staged.order_mut(order_id)?;
    order.order_status = status;
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn set_payment_status(&mut self, order_id: Uuid, status: PaymentStatus) -> Result<(), StoreError> {
    let order = self.staged.order_mut(order_id)?;
    order.payment_status = status;
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn insert_transaction(&mut self, transaction: &PaymentTransaction) -> Result<(), StoreError> {
    if self.staged.transactions.contains_key(&transaction.gateway_transaction_id) {
      return Err(StoreError::Duplicate(format!(
        "gateway transaction {}",
        transaction.gateway_transaction_id
      )));
    }
    self
      .staged
      .transactions
      .insert(transaction.gateway_transaction_id.clone(), transaction.clone());
    Ok(())
  }

  async fn lock_transaction(&mut self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    Ok(self.staged.transactions.get(gateway_transaction_id).cloned())
  }

  async fn set_transaction_status(&mut self, transaction_id: Uuid, status: PaymentStatus) -> Result<(), StoreError> {
    let transaction = self
      .staged
      .transactions
      .values_mut()
      .find(|t| t.id == transaction_id)
      .ok_or_else(|| StoreError::Unavailable(format!("payment transaction {} does not exist", transaction_id)))?;
    transaction.status = status;
    transaction.updated_at = Utc::now();
    Ok(())
  }

  async fn record_admin_action(&mut self, action: &AdminAction) -> Result<(), StoreError> {
    self.staged.admin_actions.push(action.clone());
    Ok(())
  }

  async fn commit(self: Box<Self>) -> Result<(), StoreError> {
    let MemoryTx { mut guard, staged } = *self;
    *guard = staged;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal::Decimal;

  #[tokio::test]
  async fn dropped_transaction_discards_staged_changes() {
    let store = MemoryStore::new();
    let listing = Listing::new("Honey", Decimal::new(8500, 2), 5);
    let listing_id = listing.id;
    store.insert_listing(listing).await;

    {
      let mut tx = store.begin().await.unwrap();
      assert!(tx.decrement_stock_if_available(listing_id, 3).await.unwrap());
      // dropped here without commit
    }
    assert_eq!(store.find_listing(listing_id).await.unwrap().unwrap().stock, 5);

    let mut tx = store.begin().await.unwrap();
    assert!(tx.decrement_stock_if_available(listing_id, 3).await.unwrap());
    assert!(!tx.decrement_stock_if_available(listing_id, 3).await.unwrap());
    tx.commit().await.unwrap();
    assert_eq!(store.find_listing(listing_id).await.unwrap().unwrap().stock, 2);
  }

  #[tokio::test]
  async fn sequences_are_per_year() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.next_order_sequence(2025).await.unwrap(), 1);
    assert_eq!(tx.next_order_sequence(2025).await.unwrap(), 2);
    assert_eq!(tx.next_order_sequence(2026).await.unwrap(), 1);
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.next_order_sequence(2025).await.unwrap(), 3);
  }

  #[tokio::test]
  async fn inactive_listing_is_neither_listed_nor_decremented() {
    let store = MemoryStore::new();
    let listing = Listing::new("Mangoes", Decimal::new(1200, 2), 10);
    let listing_id = listing.id;
    store.insert_listing(listing).await;
    store.set_listing_active(listing_id, false).await;

    assert!(store.active_listings_by_ids(&[listing_id]).await.unwrap().is_empty());
    let mut tx = store.begin().await.unwrap();
    assert!(!tx.decrement_stock_if_available(listing_id, 1).await.unwrap());
  }
}
