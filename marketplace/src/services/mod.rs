// src/services/mod.rs

//! Collaborators used by the workflows: stock reservation, the payment
//! gateway, notifications, analytics and order read models.

pub mod analytics;
pub mod inventory;
pub mod notifications;
pub mod order_queries;
pub mod payment_gateway;
