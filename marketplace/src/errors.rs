// src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use workflow::WorkflowError;

/// Failures of the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Database migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Duplicate record: {0}")]
  Duplicate(String),

  #[error("Store operation failed: {0}")]
  Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Insufficient stock for listing {listing_id}: {available} available")]
  InsufficientStock { listing_id: Uuid, available: i32 },

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Payment gateway unavailable: {0}")]
  PaymentGatewayUnavailable(String),

  #[error("Webhook signature verification failed")]
  InvalidSignature,

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: WorkflowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    AppError::Store(StoreError::Sqlx(err))
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) | AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::InsufficientStock { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::PaymentGatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    let body = match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) => {
        json!({"success": false, "error": m})
      }
      AppError::InsufficientStock { listing_id, available } => json!({
        "success": false,
        "error": "Insufficient stock",
        "listingId": listing_id,
        "available": available,
      }),
      AppError::Conflict(m) => json!({"success": false, "error": m}),
      AppError::PaymentGatewayUnavailable(_) => {
        json!({"success": false, "error": "Payment gateway is unavailable. Please try again later."})
      }
      AppError::InvalidSignature => json!({"success": false, "error": "Invalid webhook signature"}),
      AppError::Store(_) => json!({"success": false, "error": "Database operation failed"}),
      AppError::Workflow { source } => {
        tracing::error!(workflow_error_source = ?source, "Workflow error details");
        json!({"success": false, "error": "Workflow processing error"})
      }
      AppError::Config(_) | AppError::Internal(_) => json!({"success": false, "error": "An internal error occurred"}),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
