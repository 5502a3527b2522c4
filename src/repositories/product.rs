//! # Product Repository
//!
//! Translates catalog operations into SeaORM calls over the products table.
//! Organization and creator ids are always supplied by the caller from the
//! authenticated context, never from product attributes.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::product::{self, Entity as Product, ProductStatus};
use crate::models::user::{self, Entity as User};

/// Message returned when a delete is attempted by someone other than the
/// creator or a superadmin.
pub const DELETE_FORBIDDEN_MESSAGE: &str = "Not authorized to delete this product";

/// Attributes for a new product
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub dimension: Option<String>,
    pub status: ProductStatus,
    pub images: Vec<String>,
}

impl NewProduct {
    /// A product with the given name and every other attribute at its default.
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            description: None,
            category: None,
            unit: None,
            price: 0.0,
            stock: 0,
            dimension: None,
            status: ProductStatus::default(),
            images: Vec::new(),
        }
    }
}

/// Partial update. `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub unit: Option<Option<String>>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub dimension: Option<Option<String>>,
    pub status: Option<ProductStatus>,
    pub images: Option<Vec<String>>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Display identity of the user who created a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for CreatorSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// A product together with its creator's display identity
#[derive(Debug, Clone, PartialEq)]
pub struct ProductWithCreator {
    pub product: product::Model,
    pub created_by: Option<CreatorSummary>,
}

impl From<(product::Model, Option<user::Model>)> for ProductWithCreator {
    fn from((product, creator): (product::Model, Option<user::Model>)) -> Self {
        Self {
            product,
            created_by: creator.map(CreatorSummary::from),
        }
    }
}

/// Delete is allowed for the product's creator and for superadmins.
pub fn can_delete(product: &product::Model, user: &user::Model) -> bool {
    product.created_by_id == user.id || user.is_super_admin
}

/// Repository for product database operations
#[derive(Debug, Clone)]
pub struct ProductRepository {
    db: Arc<DatabaseConnection>,
}

impl ProductRepository {
    /// Creates a new ProductRepository over a shared connection pool
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persists a new product owned by `organization_id` and `created_by_id`.
    pub async fn create(
        &self,
        new_product: NewProduct,
        organization_id: Uuid,
        created_by_id: Uuid,
    ) -> Result<product::Model, RepositoryError> {
        let name = validate_name(&new_product.name)?;
        validate_price(new_product.price)?;
        validate_stock(new_product.stock)?;

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(normalize_label(new_product.description)),
            category: Set(normalize_label(new_product.category)),
            unit: Set(normalize_label(new_product.unit)),
            price: Set(new_product.price),
            stock: Set(new_product.stock),
            dimension: Set(normalize_label(new_product.dimension)),
            status: Set(new_product.status),
            images: Set(Some(images_json(new_product.images))),
            organization_id: Set(organization_id),
            created_by_id: Set(created_by_id),
            created_at: Set(Utc::now().into()),
        };

        let created = product
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            product_id = %created.id,
            organization_id = %organization_id,
            created_by_id = %created_by_id,
            "Product created"
        );

        Ok(created)
    }

    /// Lists every product of an organization, newest first.
    pub async fn list_by_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ProductWithCreator>, RepositoryError> {
        let rows = Product::find()
            .find_also_related(User)
            .filter(product::Column::OrganizationId.eq(organization_id))
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows.into_iter().map(ProductWithCreator::from).collect())
    }

    /// Finds a product by id in any organization.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ProductWithCreator>, RepositoryError> {
        let row = Product::find_by_id(id)
            .find_also_related(User)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(row.map(ProductWithCreator::from))
    }

    /// Applies a partial update. Performs no authorization.
    pub async fn update(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<product::Model, RepositoryError> {
        let existing = Product::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Product not found"))?;

        if changes.is_empty() {
            return Ok(existing);
        }

        let mut active = existing.into_active_model();

        if let Some(name) = changes.name {
            active.name = Set(validate_name(&name)?);
        }
        if let Some(description) = changes.description {
            active.description = Set(normalize_label(description));
        }
        if let Some(category) = changes.category {
            active.category = Set(normalize_label(category));
        }
        if let Some(unit) = changes.unit {
            active.unit = Set(normalize_label(unit));
        }
        if let Some(price) = changes.price {
            validate_price(price)?;
            active.price = Set(price);
        }
        if let Some(stock) = changes.stock {
            validate_stock(stock)?;
            active.stock = Set(stock);
        }
        if let Some(dimension) = changes.dimension {
            active.dimension = Set(normalize_label(dimension));
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(images) = changes.images {
            active.images = Set(Some(images_json(images)));
        }

        let updated = active
            .update(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(product_id = %id, "Product updated");

        Ok(updated)
    }

    /// Permanently deletes a product if the requesting user is its creator or a superadmin.
    pub async fn delete_with_authorization(
        &self,
        id: Uuid,
        requesting_user_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let product = Product::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Product not found"))?;

        let user = User::find_by_id(requesting_user_id)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;

        if !can_delete(&product, &user) {
            tracing::warn!(
                product_id = %id,
                user_id = %requesting_user_id,
                "Rejected product delete by non-owner"
            );
            return Err(RepositoryError::Forbidden(
                DELETE_FORBIDDEN_MESSAGE.to_string(),
            ));
        }

        let result = Product::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        // A concurrent delete can win between the lookup and this statement.
        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Product not found"));
        }

        tracing::info!(
            product_id = %id,
            user_id = %requesting_user_id,
            super_admin_override = product.created_by_id != user.id,
            "Product deleted"
        );

        Ok(())
    }

    /// Every distinct non-null category across all organizations, ascending.
    pub async fn list_distinct_categories(&self) -> Result<Vec<String>, RepositoryError> {
        Product::find()
            .select_only()
            .column(product::Column::Category)
            .distinct()
            .filter(product::Column::Category.is_not_null())
            .order_by_asc(product::Column::Category)
            .into_tuple::<String>()
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

fn validate_name(name: &str) -> Result<String, RepositoryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_error(
            "Product name cannot be empty",
        ));
    }
    if trimmed.chars().count() > 255 {
        return Err(RepositoryError::validation_error(
            "Product name cannot exceed 255 characters",
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> Result<(), RepositoryError> {
    if !price.is_finite() || price < 0.0 {
        return Err(RepositoryError::validation_error(
            "Product price must be a non-negative number",
        ));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), RepositoryError> {
    if stock < 0 {
        return Err(RepositoryError::validation_error(
            "Product stock cannot be negative",
        ));
    }
    Ok(())
}

/// Blank labels are stored as NULL so they never show up as categories.
fn normalize_label(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn images_json(images: Vec<String>) -> JsonValue {
    JsonValue::Array(images.into_iter().map(JsonValue::String).collect())
}
