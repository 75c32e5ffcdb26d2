// src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::analytics::AnalyticsSink;
use crate::services::notifications::NotificationSender;
use crate::services::payment_gateway::PaymentGateway;
use crate::store::MarketplaceStore;
use std::sync::Arc;
use workflow::Workflows;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn MarketplaceStore>,
  pub workflows: Arc<Workflows<AppError>>,
  pub config: Arc<AppConfig>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub notifier: Arc<dyn NotificationSender>,
  pub analytics: Arc<dyn AnalyticsSink>,
}

impl AppState {
  /// Wires the collaborators together and registers every pipeline.
  pub fn new(
    config: Arc<AppConfig>,
    store: Arc<dyn MarketplaceStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSender>,
    analytics: Arc<dyn AnalyticsSink>,
  ) -> Self {
    let workflows = Arc::new(Workflows::<AppError>::new());
    pipelines::register_all_pipelines(&workflows);
    Self {
      store,
      workflows,
      config,
      gateway,
      notifier,
      analytics,
    }
  }
}
