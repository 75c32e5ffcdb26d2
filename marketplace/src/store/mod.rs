// src/store/mod.rs

//! Persistence seam. Workflows talk to [`MarketplaceStore`] for reads and to a
//! [`StoreTx`] for everything that must commit or roll back as a unit.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{AdminAction, Listing, Order, OrderItem, OrderStatus, PaymentStatus, PaymentTransaction};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
  /// Opens a transaction. Dropping the handle without `commit` rolls it back.
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

  /// Active listings among `ids`. Missing or inactive ids are left out.
  async fn active_listings_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError>;

  async fn find_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, StoreError>;

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError>;

  /// Items of every order in `order_ids`, in one read.
  async fn items_for_orders(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, StoreError>;

  /// Orders of one user, newest first.
  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;

  /// Every order, newest first.
  async fn all_orders(&self) -> Result<Vec<Order>, StoreError>;

  async fn find_transaction(&self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError>;

  async fn admin_actions_for_order(&self, order_id: Uuid) -> Result<Vec<AdminAction>, StoreError>;
}

/// An open store transaction.
#[async_trait]
pub trait StoreTx: Send {
  /// Increments and returns the order number counter for `year`.
  async fn next_order_sequence(&mut self, year: i32) -> Result<i64, StoreError>;

  async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

  async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<(), StoreError>;

  /// Single conditional decrement: succeeds only for an active listing with
  /// at least `quantity` in stock.
  async fn decrement_stock_if_available(&mut self, listing_id: Uuid, quantity: i32) -> Result<bool, StoreError>;

  /// Reads a listing regardless of its active flag.
  async fn find_listing(&mut self, listing_id: Uuid) -> Result<Option<Listing>, StoreError>;

  /// Reads the order and holds its row lock until the transaction ends.
  async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

  async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<(), StoreError>;

  async fn set_payment_status(&mut self, order_id: Uuid, status: PaymentStatus) -> Result<(), StoreError>;

  /// Fails with [`StoreError::Duplicate`] if the gateway transaction id is taken.
  async fn insert_transaction(&mut self, transaction: &PaymentTransaction) -> Result<(), StoreError>;

  /// Reads the payment transaction and holds its row lock until the transaction ends.
  async fn lock_transaction(&mut self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError>;

  async fn set_transaction_status(&mut self, transaction_id: Uuid, status: PaymentStatus) -> Result<(), StoreError>;

  async fn record_admin_action(&mut self, action: &AdminAction) -> Result<(), StoreError>;

  async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
