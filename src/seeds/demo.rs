//! Demo data seeding
//!
//! Creates a demo organization, a superadmin user and a couple of sample
//! products. Running the seed repeatedly leaves existing rows untouched.

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Organization, Product, User, organization, product, user};
use crate::repositories::{NewProduct, ProductRepository};

pub const DEMO_ORGANIZATION_NAME: &str = "Demo Org";
pub const DEMO_ADMIN_EMAIL: &str = "admin@example.com";

/// Identifiers of the seeded demo rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSeed {
    pub organization_id: Uuid,
    pub admin_user_id: Uuid,
    pub products_created: usize,
}

fn sample_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            description: Some("Biodegradable toothbrush made of bamboo.".to_string()),
            category: Some("Sustainables".to_string()),
            unit: Some("piece".to_string()),
            price: 25.0,
            stock: 100,
            dimension: Some("20x5x2 cm".to_string()),
            ..NewProduct::named("Eco-friendly Toothbrush")
        },
        NewProduct {
            description: Some("High quality organic almonds.".to_string()),
            category: Some("Food".to_string()),
            unit: Some("kg".to_string()),
            price: 800.0,
            stock: 50,
            dimension: Some("—".to_string()),
            ..NewProduct::named("Organic Almonds")
        },
    ]
}

/// Seeds the demo organization, its superadmin and the sample products.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<DemoSeed> {
    let organization = find_or_create_organization(db).await?;
    let admin = find_or_create_admin(db, organization.id).await?;

    let repo = ProductRepository::new(Arc::new(db.clone()));
    let mut products_created = 0;

    for sample in sample_products() {
        let existing = Product::find()
            .filter(product::Column::OrganizationId.eq(organization.id))
            .filter(product::Column::Name.eq(sample.name.as_str()))
            .count(db)
            .await
            .context("Failed to look up demo product")?;

        if existing > 0 {
            log::info!("Product '{}' already exists, skipping", sample.name);
            continue;
        }

        let name = sample.name.clone();
        repo.create(sample, organization.id, admin.id)
            .await
            .with_context(|| format!("Failed to create demo product '{}'", name))?;
        log::info!("Created demo product: {}", name);
        products_created += 1;
    }

    log::info!(
        "Demo data ready: organization {}, admin {}, {} new products",
        organization.id,
        admin.id,
        products_created
    );

    Ok(DemoSeed {
        organization_id: organization.id,
        admin_user_id: admin.id,
        products_created,
    })
}

async fn find_or_create_organization(db: &DatabaseConnection) -> Result<organization::Model> {
    if let Some(existing) = Organization::find()
        .filter(organization::Column::Name.eq(DEMO_ORGANIZATION_NAME))
        .one(db)
        .await
        .context("Failed to look up demo organization")?
    {
        log::info!("Organization '{}' already exists, skipping", DEMO_ORGANIZATION_NAME);
        return Ok(existing);
    }

    log::info!("Creating organization: {}", DEMO_ORGANIZATION_NAME);
    organization::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(DEMO_ORGANIZATION_NAME.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .context("Failed to create demo organization")
}

async fn find_or_create_admin(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> Result<user::Model> {
    if let Some(existing) = User::find()
        .filter(user::Column::Email.eq(DEMO_ADMIN_EMAIL))
        .one(db)
        .await
        .context("Failed to look up demo admin")?
    {
        log::info!("User '{}' already exists, skipping", DEMO_ADMIN_EMAIL);
        return Ok(existing);
    }

    log::info!("Creating superadmin: {}", DEMO_ADMIN_EMAIL);
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        name: Set("Admin User".to_string()),
        email: Set(DEMO_ADMIN_EMAIL.to_string()),
        password_hash: Set(Some("hashedpassword".to_string())),
        is_super_admin: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .context("Failed to create demo admin")
}
