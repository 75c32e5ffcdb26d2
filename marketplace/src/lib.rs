// src/lib.rs

//! Marketplace order placement and payment reconciliation service.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
