//! Database seeding functionality
//!
//! This module provides functionality to seed the database with demo data
//! for local development and manual testing of the dashboard.

pub mod demo;

pub use demo::{DemoSeed, seed_demo_data};
