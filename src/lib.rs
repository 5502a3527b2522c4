//! # Catalog API Library
//!
//! This library provides the core functionality for the Catalog service,
//! including handlers, models, persistence and the dashboard client.

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub use migration;
