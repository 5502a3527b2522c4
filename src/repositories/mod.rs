//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access with organization-aware methods.

pub mod product;

pub use product::{
    CreatorSummary, NewProduct, ProductChanges, ProductRepository, ProductWithCreator,
};
