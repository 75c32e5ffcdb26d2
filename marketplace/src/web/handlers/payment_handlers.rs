// src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use super::extractors::AuthenticatedUser;
use crate::errors::AppError;
use crate::pipelines::{self, InitiatePaymentRequest};
use crate::services::order_queries;
use crate::state::AppState;

#[instrument(
  name = "handler::initiate_payment",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.user_id, order_id = %req_payload.order_id)
)]
pub async fn initiate_payment_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let initiation = pipelines::initiate_payment(app_state.get_ref(), auth_user.user_id, req_payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(json!({ "success": true, "data": initiation })))
}

#[instrument(name = "handler::payment_status", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn payment_status_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  transaction_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let transaction =
    order_queries::get_payment_status(app_state.get_ref(), &transaction_id.into_inner(), auth_user.viewer()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": transaction })))
}
