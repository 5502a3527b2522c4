//! Database migrations for the Catalog API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_01_000001_create_organizations;
mod m2025_01_01_000002_create_users;
mod m2025_01_01_000003_create_products;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_01_000001_create_organizations::Migration),
            Box::new(m2025_01_01_000002_create_users::Migration),
            Box::new(m2025_01_01_000003_create_products::Migration),
        ]
    }
}
