// src/services/notifications.rs

use async_trait::async_trait;
use tracing::info;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderItem};

#[async_trait]
pub trait NotificationSender: Send + Sync {
  /// Admin notice plus customer confirmation for a freshly placed order.
  async fn notify_order_placed(&self, order: &Order, items: &[OrderItem]) -> AppResult<()>;

  async fn notify_payment_completed(&self, order: &Order) -> AppResult<()>;
}

#[derive(Debug)]
pub struct SentEmailInfo {
  pub to: String,
  pub subject: String,
  pub message_id: String,
}

/// Renders plain e-mails and logs them instead of handing them to a provider.
#[derive(Debug, Clone)]
pub struct MockEmailSender {
  sender: String,
  admin_email: String,
}

impl MockEmailSender {
  pub fn new(sender: impl Into<String>, admin_email: impl Into<String>) -> Self {
    Self {
      sender: sender.into(),
      admin_email: admin_email.into(),
    }
  }

  // Customers are addressed by user id; resolving that to a mailbox belongs to the mail relay.
  fn customer_address(order: &Order) -> String {
    format!("user:{}", order.user_id)
  }

  async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<SentEmailInfo> {
    if to.trim().is_empty() {
      return Err(AppError::Internal(format!("No recipient for e-mail '{}'", subject)));
    }
    let message_id = format!("mock_email_{}", uuid::Uuid::new_v4());
    info!(
      from = %self.sender,
      to,
      subject,
      body_preview = %body.chars().take(80).collect::<String>(),
      %message_id,
      "Mock email sent."
    );
    Ok(SentEmailInfo {
      to: to.to_string(),
      subject: subject.to_string(),
      message_id,
    })
  }
}

fn render_items(items: &[OrderItem]) -> String {
  items
    .iter()
    .map(|item| {
      format!(
        "- {} x {} @ {} = {}",
        item.quantity, item.listing_id, item.unit_price, item.subtotal
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

#[async_trait]
impl NotificationSender for MockEmailSender {
  async fn notify_order_placed(&self, order: &Order, items: &[OrderItem]) -> AppResult<()> {
    let lines = render_items(items);
    self
      .send(
        &self.admin_email,
        &format!("New order {}", order.order_number),
        &format!(
          "Order {} was placed for {} ({} line(s)).\n{}",
          order.order_number,
          order.total_amount,
          items.len(),
          lines
        ),
      )
      .await?;
    self
      .send(
        &Self::customer_address(order),
        &format!("Your order {} is confirmed", order.order_number),
        &format!(
          "Thank you for your order {}.\nTotal: {}\n{}",
          order.order_number, order.total_amount, lines
        ),
      )
      .await?;
    Ok(())
  }

  async fn notify_payment_completed(&self, order: &Order) -> AppResult<()> {
    self
      .send(
        &Self::customer_address(order),
        &format!("Payment received for order {}", order.order_number),
        &format!(
          "We received your payment of {} for order {}. It is now awaiting fulfillment.",
          order.total_amount, order.order_number
        ),
      )
      .await?;
    Ok(())
  }
}
