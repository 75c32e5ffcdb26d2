// src/models/mod.rs

//! Data structures representing database entities.

pub mod admin_action;
pub mod listing;
pub mod order;
pub mod order_item;
pub mod payment_transaction;

pub use admin_action::AdminAction;
pub use listing::Listing;
pub use order::{format_order_number, Order, OrderStatus, PaymentMethod, PaymentStatus};
pub use order_item::OrderItem;
pub use payment_transaction::PaymentTransaction;
