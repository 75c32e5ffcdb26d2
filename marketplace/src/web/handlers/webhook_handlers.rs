// src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines;
use crate::services::payment_gateway::SIGNATURE_HEADER;
use crate::state::AppState;

/// Gateway callback. Every processed delivery, no-ops included, is answered
/// with `{received: true}` so the gateway stops retrying; only a bad
/// signature (401) or a malformed body (400) is an error.
#[instrument(
  name = "handler::payment_webhook",
  skip(app_state, req, body),
  fields(payload_bytes = body.len())
)]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature_header = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|h_val| h_val.to_str().ok())
    .map(String::from);

  let outcome = pipelines::reconcile_payment(app_state.get_ref(), body.to_vec(), signature_header).await?;
  info!(?outcome, "Payment webhook acknowledged.");
  Ok(HttpResponse::Ok().json(json!({ "received": true })))
}
