// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::extractors::{AdminUser, AuthenticatedUser};
use crate::errors::AppError;
use crate::pipelines::{self, PlaceOrderRequest, UpdateOrderStatusRequest};
use crate::services::order_queries;
use crate::state::AppState;

#[instrument(
  name = "handler::create_order",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.user_id)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let placed = pipelines::place_order(app_state.get_ref(), auth_user.user_id, req_payload.into_inner()).await?;
  info!(order_number = %placed.order.order_number, "Order created.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "data": placed,
  })))
}

#[instrument(name = "handler::my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = order_queries::find_my_orders(app_state.get_ref(), auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": orders })))
}

#[instrument(name = "handler::all_orders", skip(app_state, admin), fields(admin_id = %admin.0.user_id))]
pub async fn all_orders_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let orders = order_queries::find_all_orders(app_state.get_ref()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = order_queries::find_order(app_state.get_ref(), order_id.into_inner(), auth_user.viewer()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": order })))
}

#[instrument(
  name = "handler::update_order_status",
  skip(app_state, admin, req_payload),
  fields(admin_id = %admin.0.user_id)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  order_id: web::Path<Uuid>,
  req_payload: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
  let order = pipelines::update_order_status(
    app_state.get_ref(),
    admin.0.user_id,
    order_id.into_inner(),
    req_payload.into_inner(),
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": order })))
}
