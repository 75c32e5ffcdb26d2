// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{MarketplaceStore, StoreTx};
use crate::errors::StoreError;
use crate::models::{AdminAction, Listing, Order, OrderItem, OrderStatus, PaymentStatus, PaymentTransaction};

const ORDER_COLUMNS: &str = "id, order_number, user_id, payment_method, total_amount, order_status, payment_status, \
                             created_at, updated_at";
const LISTING_COLUMNS: &str = "id, title, price, stock, is_active, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, order_id, gateway_transaction_id, amount, currency, status, created_at, updated_at";

fn map_unique_violation(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
  match &err {
    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Duplicate(what()),
    _ => StoreError::Sqlx(err),
  }
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }
}

#[async_trait]
impl MarketplaceStore for PgStore {
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
    let tx = self.pool.begin().await?;
    Ok(Box::new(PgTx { tx }))
  }

  async fn active_listings_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError> {
    let sql = format!("SELECT {} FROM listings WHERE id = ANY($1) AND is_active", LISTING_COLUMNS);
    let listings = sqlx::query_as::<_, Listing>(&sql)
      .bind(ids)
      .fetch_all(&self.pool)
      .await?;
    Ok(listings)
  }

  async fn find_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, StoreError> {
    let sql = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);
    Ok(
      sqlx::query_as::<_, Listing>(&sql)
        .bind(listing_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    Ok(
      sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
    Ok(
      sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, listing_id, quantity, unit_price, subtotal FROM order_items WHERE order_id = $1",
      )
      .bind(order_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn items_for_orders(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, StoreError> {
    if order_ids.is_empty() {
      return Ok(Vec::new());
    }
    Ok(
      sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, listing_id, quantity, unit_price, subtotal FROM order_items WHERE order_id = ANY($1)",
      )
      .bind(order_ids)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, order_number DESC",
      ORDER_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Order>(&sql)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
    let sql = format!(
      "SELECT {} FROM orders ORDER BY created_at DESC, order_number DESC",
      ORDER_COLUMNS
    );
    Ok(sqlx::query_as::<_, Order>(&sql).fetch_all(&self.pool).await?)
  }

  async fn find_transaction(&self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    let sql = format!(
      "SELECT {} FROM payment_transactions WHERE gateway_transaction_id = $1",
      TRANSACTION_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, PaymentTransaction>(&sql)
        .bind(gateway_transaction_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn admin_actions_for_order(&self, order_id: Uuid) -> Result<Vec<AdminAction>, StoreError> {
    Ok(
      sqlx::query_as::<_, AdminAction>(
        "SELECT id, admin_id, order_id, action_type, notes, created_at FROM admin_actions \
         WHERE order_id = $1 ORDER BY created_at",
      )
      .bind(order_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }
}

/// Wraps a sqlx transaction; dropping it without `commit` rolls back.
pub struct PgTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
  async fn next_order_sequence(&mut self, year: i32) -> Result<i64, StoreError> {
    let value = sqlx::query_scalar::<_, i64>(
      "INSERT INTO order_number_sequences (year, last_value) VALUES ($1, 1) \
       ON CONFLICT (year) DO UPDATE SET last_value = order_number_sequences.last_value + 1 \
       RETURNING last_value",
    )
    .bind(year)
    .fetch_one(&mut *self.tx)
    .await?;
    Ok(value)
  }

  async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO orders (id, order_number, user_id, payment_method, total_amount, order_status, payment_status, \
       created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(order.payment_method)
    .bind(order.total_amount)
    .bind(order.order_status)
    .bind(order.payment_status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| map_unique_violation(e, || format!("order number {}", order.order_number)))?;
    Ok(())
  }

  async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<(), StoreError> {
    for item in items {
      sqlx::query(
        "INSERT INTO order_items (id, order_id, listing_id, quantity, unit_price, subtotal) \
         VALUES ($1, $2, $3, $4, $5, $6)",
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.listing_id)
      .bind(item.quantity)
      .bind(item.unit_price)
      .bind(item.subtotal)
      .execute(&mut *self.tx)
      .await?;
    }
    Ok(())
  }

  async fn decrement_stock_if_available(&mut self, listing_id: Uuid, quantity: i32) -> Result<bool, StoreError> {
    let result = sqlx::query(
      "UPDATE listings SET stock = stock - $2, updated_at = NOW() \
       WHERE id = $1 AND stock >= $2 AND is_active",
    )
    .bind(listing_id)
    .bind(quantity)
    .execute(&mut *self.tx)
    .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn find_listing(&mut self, listing_id: Uuid) -> Result<Option<Listing>, StoreError> {
    let sql = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);
    Ok(
      sqlx::query_as::<_, Listing>(&sql)
        .bind(listing_id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
    Ok(
      sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<(), StoreError> {
    sqlx::query("UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1")
      .bind(order_id)
      .bind(status)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn set_payment_status(&mut self, order_id: Uuid, status: PaymentStatus) -> Result<(), StoreError> {
    sqlx::query("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1")
      .bind(order_id)
      .bind(status)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn insert_transaction(&mut self, transaction: &PaymentTransaction) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO payment_transactions (id, order_id, gateway_transaction_id, amount, currency, status, \
       created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(transaction.id)
    .bind(transaction.order_id)
    .bind(&transaction.gateway_transaction_id)
    .bind(transaction.amount)
    .bind(&transaction.currency)
    .bind(transaction.status)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| {
      map_unique_violation(e, || {
        format!("gateway transaction {}", transaction.gateway_transaction_id)
      })
    })?;
    Ok(())
  }

  async fn lock_transaction(&mut self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    let sql = format!(
      "SELECT {} FROM payment_transactions WHERE gateway_transaction_id = $1 FOR UPDATE",
      TRANSACTION_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, PaymentTransaction>(&sql)
        .bind(gateway_transaction_id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn set_transaction_status(&mut self, transaction_id: Uuid, status: PaymentStatus) -> Result<(), StoreError> {
    sqlx::query("UPDATE payment_transactions SET status = $2, updated_at = NOW() WHERE id = $1")
      .bind(transaction_id)
      .bind(status)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn record_admin_action(&mut self, action: &AdminAction) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO admin_actions (id, admin_id, order_id, action_type, notes, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(action.id)
    .bind(action.admin_id)
    .bind(action.order_id)
    .bind(&action.action_type)
    .bind(&action.notes)
    .bind(action.created_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn commit(self: Box<Self>) -> Result<(), StoreError> {
    self.tx.commit().await?;
    Ok(())
  }
}
