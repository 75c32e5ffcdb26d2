// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use marketplace::config::AppConfig;
use marketplace::errors::{AppError, Result as AppResult, StoreError};
use marketplace::models::{
  AdminAction, Listing, Order, OrderItem, OrderStatus, PaymentStatus, PaymentTransaction,
};
use marketplace::pipelines::contexts::CartLine;
use marketplace::pipelines::{place_order, PlaceOrderRequest, PlacedOrder};
use marketplace::services::analytics::AnalyticsSink;
use marketplace::services::notifications::NotificationSender;
use marketplace::services::payment_gateway::{
  sign_webhook_payload, GatewayError, GatewaySession, PaymentGateway, PaymentRequest,
};
use marketplace::state::AppState;
use marketplace::store::{MarketplaceStore, MemoryStore, StoreTx};
use marketplace::models::PaymentMethod;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  let vars: HashMap<&str, &str> = HashMap::from([
    ("DATABASE_URL", "postgres://unused/marketplace_test"),
    ("APP_ENV", "test"),
    ("APP_BASE_URL", "http://shop.test"),
    ("ORDER_NUMBER_PREFIX", "FR"),
    ("DEFAULT_CURRENCY", "MUR"),
    ("PAYMENT_WEBHOOK_SECRET", WEBHOOK_SECRET),
  ]);
  AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("test config")
}

// --- Recording collaborators ---

#[derive(Default)]
pub struct RecordingNotifier {
  pub orders_placed: Mutex<Vec<Uuid>>,
  pub payments_completed: Mutex<Vec<Uuid>>,
  pub fail: bool,
}

impl RecordingNotifier {
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Default::default()
    }
  }

  pub fn placed_count(&self) -> usize {
    self.orders_placed.lock().len()
  }

  pub fn payment_completed_count(&self) -> usize {
    self.payments_completed.lock().len()
  }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
  async fn notify_order_placed(&self, order: &Order, _items: &[OrderItem]) -> AppResult<()> {
    self.orders_placed.lock().push(order.id);
    if self.fail {
      return Err(AppError::Internal("mail relay down".to_string()));
    }
    Ok(())
  }

  async fn notify_payment_completed(&self, order: &Order) -> AppResult<()> {
    self.payments_completed.lock().push(order.id);
    if self.fail {
      return Err(AppError::Internal("mail relay down".to_string()));
    }
    Ok(())
  }
}

#[derive(Default)]
pub struct RecordingAnalytics {
  pub events: Mutex<Vec<(Uuid, String, JsonValue)>>,
}

impl RecordingAnalytics {
  pub fn count(&self, event_name: &str) -> usize {
    self.events.lock().iter().filter(|(_, name, _)| name == event_name).count()
  }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
  async fn track(&self, user_id: Uuid, event_name: &str, properties: JsonValue) -> AppResult<()> {
    self.events.lock().push((user_id, event_name.to_string(), properties));
    Ok(())
  }
}

/// Gateway double that hands out `GW-<n>` ids, or fails every call.
#[derive(Default)]
pub struct StubGateway {
  pub calls: AtomicUsize,
  pub unavailable: bool,
}

impl StubGateway {
  pub fn unavailable() -> Self {
    Self {
      unavailable: true,
      ..Default::default()
    }
  }
}

#[async_trait]
impl PaymentGateway for StubGateway {
  async fn initiate_payment(&self, request: &PaymentRequest) -> Result<GatewaySession, GatewayError> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if self.unavailable {
      return Err(GatewayError::Timeout);
    }
    Ok(GatewaySession {
      transaction_id: format!("GW-{}-{}", request.order_ref, n),
      payment_url: format!("https://pay.test/{}", n),
      qr_code_url: Some(format!("https://pay.test/{}/qr", n)),
    })
  }
}

// --- Harness ---

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub notifier: Arc<RecordingNotifier>,
  pub analytics: Arc<RecordingAnalytics>,
  pub gateway: Arc<StubGateway>,
}

impl TestApp {
  pub fn new() -> Self {
    Self::build(RecordingNotifier::default(), StubGateway::default())
  }

  pub fn with_notifier(notifier: RecordingNotifier) -> Self {
    Self::build(notifier, StubGateway::default())
  }

  pub fn with_gateway(gateway: StubGateway) -> Self {
    Self::build(RecordingNotifier::default(), gateway)
  }

  fn build(notifier: RecordingNotifier, gateway: StubGateway) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    Self::with_store(store.clone(), store, notifier, gateway)
  }

  /// `store` backs the state; `memory` is the same data for assertions.
  pub fn with_store(
    memory: Arc<MemoryStore>,
    store: Arc<dyn MarketplaceStore>,
    notifier: RecordingNotifier,
    gateway: StubGateway,
  ) -> Self {
    setup_tracing();
    let notifier = Arc::new(notifier);
    let analytics = Arc::new(RecordingAnalytics::default());
    let gateway = Arc::new(gateway);
    let state = AppState::new(
      Arc::new(test_config()),
      store,
      gateway.clone(),
      notifier.clone(),
      analytics.clone(),
    );
    Self {
      state,
      store: memory,
      notifier,
      analytics,
      gateway,
    }
  }

  pub async fn seed_listing(&self, title: &str, price: Decimal, stock: i32) -> Uuid {
    let listing = Listing::new(title, price, stock);
    let id = listing.id;
    self.store.insert_listing(listing).await;
    id
  }

  pub async fn stock_of(&self, listing_id: Uuid) -> i32 {
    self
      .store
      .find_listing(listing_id)
      .await
      .unwrap()
      .expect("listing exists")
      .stock
  }

  pub async fn order(&self, order_id: Uuid) -> Order {
    self.store.find_order(order_id).await.unwrap().expect("order exists")
  }

  pub async fn transaction(&self, gateway_transaction_id: &str) -> PaymentTransaction {
    self
      .store
      .find_transaction(gateway_transaction_id)
      .await
      .unwrap()
      .expect("transaction exists")
  }

  pub async fn place(
    &self,
    user_id: Uuid,
    payment_method: PaymentMethod,
    lines: &[(Uuid, i32)],
  ) -> AppResult<PlacedOrder> {
    place_order(
      &self.state,
      user_id,
      PlaceOrderRequest {
        items: lines
          .iter()
          .map(|(listing_id, quantity)| CartLine {
            listing_id: *listing_id,
            quantity: *quantity,
          })
          .collect(),
        payment_method,
      },
    )
    .await
  }
}

// --- Webhook helpers ---

pub fn webhook_body(gateway_transaction_id: &str, status: &str, order_id: Uuid) -> Vec<u8> {
  serde_json::to_vec(&serde_json::json!({
    "gatewayTransactionId": gateway_transaction_id,
    "status": status,
    "orderId": order_id,
  }))
  .unwrap()
}

pub fn sign(body: &[u8]) -> Option<String> {
  Some(sign_webhook_payload(body, WEBHOOK_SECRET).unwrap())
}

/// Polls `condition` until it holds or one second has passed.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
  for _ in 0..100 {
    if condition() {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  condition()
}

/// Gives detached steps time to run before asserting that something did NOT happen.
pub async fn settle() {
  tokio::time::sleep(Duration::from_millis(50)).await;
}

// --- Failure injection ---

/// Delegates to a `MemoryStore` but fails the stock decrement after
/// `decrements_before_failure` successful ones in each transaction.
pub struct FailingStore {
  pub inner: Arc<MemoryStore>,
  pub decrements_before_failure: usize,
}

#[async_trait]
impl MarketplaceStore for FailingStore {
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
    Ok(Box::new(FailingTx {
      inner: self.inner.begin().await?,
      remaining: self.decrements_before_failure,
    }))
  }

  async fn active_listings_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError> {
    self.inner.active_listings_by_ids(ids).await
  }

  async fn find_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, StoreError> {
    self.inner.find_listing(listing_id).await
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    self.inner.find_order(order_id).await
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
    self.inner.order_items(order_id).await
  }

  async fn items_for_orders(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, StoreError> {
    self.inner.items_for_orders(order_ids).await
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
    self.inner.orders_for_user(user_id).await
  }

  async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
    self.inner.all_orders().await
  }

  async fn find_transaction(&self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    self.inner.find_transaction(gateway_transaction_id).await
  }

  async fn admin_actions_for_order(&self, order_id: Uuid) -> Result<Vec<AdminAction>, StoreError> {
    self.inner.admin_actions_for_order(order_id).await
  }
}

struct FailingTx {
  inner: Box<dyn StoreTx>,
  remaining: usize,
}

#[async_trait]
impl StoreTx for FailingTx {
  async fn next_order_sequence(&mut self, year: i32) -> Result<i64, StoreError> {
    self.inner.next_order_sequence(year).await
  }

  async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
    self.inner.insert_order(order).await
  }

  async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<(), StoreError> {
    self.inner.insert_order_items(items).await
  }

  async fn decrement_stock_if_available(&mut self, listing_id: Uuid, quantity: i32) -> Result<bool, StoreError> {
    if self.remaining == 0 {
      return Err(StoreError::Unavailable("injected failure".to_string()));
    }
    self.remaining -= 1;
    self.inner.decrement_stock_if_available(listing_id, quantity).await
  }

  async fn find_listing(&mut self, listing_id: Uuid) -> Result<Option<Listing>, StoreError> {
    self.inner.find_listing(listing_id).await
  }

  async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    self.inner.lock_order(order_id).await
  }

  async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<(), StoreError> {
    self.inner.set_order_status(order_id, status).await
  }

  async fn set_payment_status(&mut self, order_id: Uuid, status: PaymentStatus) -> Result<(), StoreError> {
    self.inner.set_payment_status(order_id, status).await
  }

  async fn insert_transaction(&mut self, transaction: &PaymentTransaction) -> Result<(), StoreError> {
    self.inner.insert_transaction(transaction).await
  }

  async fn lock_transaction(&mut self, gateway_transaction_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    self.inner.lock_transaction(gateway_transaction_id).await
  }

  async fn set_transaction_status(&mut self, transaction_id: Uuid, status: PaymentStatus) -> Result<(), StoreError> {
    self.inner.set_transaction_status(transaction_id, status).await
  }

  async fn record_admin_action(&mut self, action: &AdminAction) -> Result<(), StoreError> {
    self.inner.record_admin_action(action).await
  }

  async fn commit(self: Box<Self>) -> Result<(), StoreError> {
    self.inner.commit().await
  }
}
