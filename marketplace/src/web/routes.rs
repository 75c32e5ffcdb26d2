// src/web/routes.rs

use actix_web::web;

use crate::errors::AppError;
use crate::web::handlers::{order_handlers, payment_handlers, webhook_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(
    web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into()),
  );
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Literal segments go before `/{id}`.
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("/my-orders", web::get().to(order_handlers::my_orders_handler))
          .route("/admin/all", web::get().to(order_handlers::all_orders_handler))
          .route("/{id}", web::get().to(order_handlers::get_order_handler))
          .route("/{id}/status", web::patch().to(order_handlers::update_order_status_handler)),
      )
      .service(
        web::scope("/payments")
          .route("/initiate", web::post().to(payment_handlers::initiate_payment_handler))
          .route("/webhook", web::post().to(webhook_handlers::payment_webhook_handler))
          .route(
            "/status/{transaction_id}",
            web::get().to(payment_handlers::payment_status_handler),
          ),
      ),
  );
}
