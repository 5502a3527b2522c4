//! # Products API Handlers
//!
//! CRUD endpoints for catalog products. Every endpoint except the category
//! listing requires an authenticated [`Principal`]; the principal's
//! organization and user ids are the only source of product ownership.

use axum::{
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Principal;
use crate::config::IdLookupScope;
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::types::{DataResponse, MessageResponse};
use crate::models::product::{self, ProductStatus};
use crate::repositories::{CreatorSummary, NewProduct, ProductChanges, ProductWithCreator};
use crate::server::AppState;

const MAX_NAME_LENGTH: usize = 255;
const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Display identity of a product's creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatorDto {
    pub id: Uuid,
    #[schema(example = "Admin User")]
    pub name: String,
    #[schema(example = "admin@example.com")]
    pub email: String,
}

impl From<CreatorSummary> for CreatorDto {
    fn from(creator: CreatorSummary) -> Self {
        Self {
            id: creator.id,
            name: creator.name,
            email: creator.email,
        }
    }
}

/// Product as exposed over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: Uuid,
    #[schema(example = "Organic Almonds")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "Food")]
    pub category: Option<String>,
    #[schema(example = "kg")]
    pub unit: Option<String>,
    #[schema(example = 800.0)]
    pub price: f64,
    #[schema(example = 50)]
    pub stock: i32,
    pub dimension: Option<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub images: Vec<String>,
    pub organization_id: Uuid,
    pub created_by_id: Uuid,
    /// Creation timestamp (RFC 3339)
    #[schema(example = "2025-01-15T10:30:00+00:00")]
    pub created_at: String,
    #[serde(default)]
    pub created_by: Option<CreatorDto>,
}

impl ProductDto {
    fn from_model(model: product::Model, created_by: Option<CreatorSummary>) -> Self {
        let images = model.image_urls();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category: model.category,
            unit: model.unit,
            price: model.price,
            stock: model.stock,
            dimension: model.dimension,
            status: model.status,
            images,
            organization_id: model.organization_id,
            created_by_id: model.created_by_id,
            created_at: model.created_at.to_rfc3339(),
            created_by: created_by.map(CreatorDto::from),
        }
    }
}

impl From<ProductWithCreator> for ProductDto {
    fn from(row: ProductWithCreator) -> Self {
        Self::from_model(row.product, row.created_by)
    }
}

/// Request payload for creating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProductRequest {
    /// Display name (required, max 255 characters)
    #[schema(example = "Widget")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Defaults to 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 10.0)]
    pub price: Option<f64>,
    /// Defaults to 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 5)]
    pub stock: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// Defaults to `ACTIVE`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    /// Absolute image URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// Ignored. The owning organization comes from the bearer token.
    #[serde(default, skip_serializing)]
    #[schema(value_type = Option<String>)]
    pub organization_id: Option<serde_json::Value>,
    /// Ignored. The creator comes from the bearer token.
    #[serde(default, skip_serializing)]
    #[schema(value_type = Option<String>)]
    pub created_by_id: Option<serde_json::Value>,
}

/// Request payload for a partial product update
///
/// Omitted fields are left untouched. For the optional text fields an explicit
/// `null` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub unit: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub dimension: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Field-level validation failures collected before calling the repository
#[derive(Debug, Default)]
struct FieldErrors(Vec<serde_json::Value>);

impl FieldErrors {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(json!({ "field": field, "message": message }));
    }

    fn into_result<T>(self, value: T) -> Result<T, ApiError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(validation_error(
                "Request validation failed",
                json!({ "errors": self.0 }),
            ))
        }
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.push("name", "Product name is required and cannot be empty");
    } else if trimmed.chars().count() > MAX_NAME_LENGTH {
        errors.push("name", "Product name cannot exceed 255 characters");
    }
}

fn check_price(errors: &mut FieldErrors, price: f64) {
    if !price.is_finite() || price < 0.0 {
        errors.push("price", "Price must be a non-negative number");
    }
}

fn check_stock(errors: &mut FieldErrors, stock: i32) {
    if stock < 0 {
        errors.push("stock", "Stock cannot be negative");
    }
}

fn check_images(errors: &mut FieldErrors, images: &[String]) {
    if images.iter().any(|image| Url::parse(image).is_err()) {
        errors.push("images", "Every image must be an absolute URL");
    }
}

impl CreateProductRequest {
    fn into_new_product(self) -> Result<NewProduct, ApiError> {
        let mut errors = FieldErrors::default();
        let price = self.price.unwrap_or(0.0);
        let stock = self.stock.unwrap_or(0);
        let images = self.images.unwrap_or_default();

        check_name(&mut errors, &self.name);
        check_price(&mut errors, price);
        check_stock(&mut errors, stock);
        check_images(&mut errors, &images);

        errors.into_result(NewProduct {
            name: self.name,
            description: self.description,
            category: self.category,
            unit: self.unit,
            price,
            stock,
            dimension: self.dimension,
            status: self.status.unwrap_or_default(),
            images,
        })
    }
}

impl UpdateProductRequest {
    fn into_changes(self) -> Result<ProductChanges, ApiError> {
        let mut errors = FieldErrors::default();

        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        if let Some(stock) = self.stock {
            check_stock(&mut errors, stock);
        }
        if let Some(images) = &self.images {
            check_images(&mut errors, images);
        }

        errors.into_result(ProductChanges {
            name: self.name,
            description: self.description,
            category: self.category,
            unit: self.unit,
            price: self.price,
            stock: self.stock,
            dimension: self.dimension,
            status: self.status,
            images: self.images,
        })
    }
}

/// Malformed ids name no product, so they answer like unknown ones.
fn product_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!(%rejection, "Rejecting malformed product id");
        not_found(PRODUCT_NOT_FOUND)
    })
}

/// Looks up a product by id, applying the configured id lookup scope.
async fn find_visible_product(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<ProductWithCreator, ApiError> {
    let row = state
        .products
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found(PRODUCT_NOT_FOUND))?;

    if state.config.id_lookup_scope == IdLookupScope::Organization
        && row.product.organization_id != principal.organization_id
    {
        tracing::debug!(
            product_id = %id,
            organization_id = %principal.organization_id,
            "Hiding product owned by another organization"
        );
        return Err(not_found(PRODUCT_NOT_FOUND));
    }

    Ok(row)
}

/// Create a product in the caller's organization
#[utoipa::path(
    post,
    path = "/api/products",
    security(("bearer_auth" = [])),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = DataResponse<ProductDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<ProductDto>>), ApiError> {
    let Json(request) = payload?;
    let new_product = request.into_new_product()?;

    let created = state
        .products
        .create(new_product, principal.organization_id, principal.user_id)
        .await?;

    let created_by = state
        .products
        .get_by_id(created.id)
        .await?
        .and_then(|row| row.created_by);

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(ProductDto::from_model(created, created_by))),
    ))
}

/// List the caller's organization's products, newest first
#[utoipa::path(
    get,
    path = "/api/products",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Products of the caller's organization", body = DataResponse<Vec<ProductDto>>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<DataResponse<Vec<ProductDto>>>, ApiError> {
    let rows = state
        .products
        .list_by_organization(principal.organization_id)
        .await?;

    Ok(Json(DataResponse::new(
        rows.into_iter().map(ProductDto::from).collect(),
    )))
}

/// Fetch a single product
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = DataResponse<ProductDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DataResponse<ProductDto>>, ApiError> {
    let id = product_id(path)?;
    let row = find_visible_product(&state, &principal, id).await?;
    Ok(Json(DataResponse::new(row.into())))
}

/// Partially update a product
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = DataResponse<ProductDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<DataResponse<ProductDto>>, ApiError> {
    let id = product_id(path)?;
    let Json(request) = payload?;
    let changes = request.into_changes()?;

    let existing = find_visible_product(&state, &principal, id).await?;
    let updated = state.products.update(id, changes).await?;

    Ok(Json(DataResponse::new(ProductDto::from_model(
        updated,
        existing.created_by,
    ))))
}

/// Delete a product (creator or superadmin only)
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Caller is neither the creator nor a superadmin", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    principal: Principal,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = product_id(path)?;
    state
        .products
        .delete_with_authorization(id, principal.user_id)
        .await?;

    Ok(Json(MessageResponse::new("Product deleted")))
}

/// List every distinct category across the catalog
#[utoipa::path(
    get,
    path = "/api/products/categories/all",
    responses(
        (status = 200, description = "Distinct categories, ascending", body = DataResponse<Vec<String>>),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<String>>>, ApiError> {
    let categories = state.products.list_distinct_categories().await?;
    Ok(Json(DataResponse::new(categories)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_create(body: serde_json::Value) -> Result<CreateProductRequest, serde_json::Error> {
        serde_json::from_value(body)
    }

    fn parse_update(body: serde_json::Value) -> Result<UpdateProductRequest, serde_json::Error> {
        serde_json::from_value(body)
    }

    #[test]
    fn create_defaults_price_stock_and_status() {
        let request = parse_create(json!({ "name": "Widget" })).unwrap();
        let new_product = request.into_new_product().unwrap();

        assert_eq!(new_product.price, 0.0);
        assert_eq!(new_product.stock, 0);
        assert_eq!(new_product.status, ProductStatus::Active);
        assert!(new_product.images.is_empty());
    }

    #[test]
    fn create_tolerates_owner_fields() {
        let request = parse_create(json!({
            "name": "Widget",
            "price": 10,
            "stock": 5,
            "organizationId": "not-even-a-uuid",
            "createdById": 42
        }))
        .unwrap();

        let new_product = request.into_new_product().unwrap();
        assert_eq!(new_product.name, "Widget");
        assert_eq!(new_product.price, 10.0);
        assert_eq!(new_product.stock, 5);
    }

    #[test]
    fn create_rejects_unknown_fields() {
        assert!(parse_create(json!({ "name": "Widget", "colour": "red" })).is_err());
    }

    #[test]
    fn create_rejects_wrong_types() {
        assert!(parse_create(json!({ "name": "Widget", "stock": "lots" })).is_err());
        assert!(parse_create(json!({ "name": "Widget", "status": "SOLD" })).is_err());
    }

    #[test]
    fn create_collects_field_errors() {
        let request = parse_create(json!({
            "name": "  ",
            "price": -1,
            "stock": -2,
            "images": ["relative/path.png"]
        }))
        .unwrap();

        let error = request.into_new_product().unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.code.as_ref(), "VALIDATION_FAILED");

        let details = error.details.unwrap();
        let fields: Vec<&str> = details["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["name", "price", "stock", "images"]);
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let request = parse_update(json!({ "category": null, "stock": 3 })).unwrap();
        let changes = request.into_changes().unwrap();

        assert_eq!(changes.category, Some(None));
        assert_eq!(changes.description, None);
        assert_eq!(changes.stock, Some(3));
        assert_eq!(changes.name, None);
    }

    #[test]
    fn update_rejects_owner_fields() {
        assert!(parse_update(json!({ "organizationId": Uuid::new_v4() })).is_err());
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let request = UpdateProductRequest {
            name: Some("Renamed".to_string()),
            category: Some(None),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "name": "Renamed", "category": null })
        );
    }

    #[test]
    fn product_dto_uses_camel_case_keys() {
        let model = product::Model {
            id: Uuid::new_v4(),
            name: "Widget".to_string(),
            description: None,
            category: Some("Tools".to_string()),
            unit: None,
            price: 10.0,
            stock: 5,
            dimension: None,
            status: ProductStatus::Active,
            images: Some(json!(["https://cdn.example.com/w.png"])),
            organization_id: Uuid::new_v4(),
            created_by_id: Uuid::new_v4(),
            created_at: chrono::Utc::now().into(),
        };

        let value = serde_json::to_value(ProductDto::from_model(model.clone(), None)).unwrap();
        assert_eq!(value["organizationId"], json!(model.organization_id));
        assert_eq!(value["createdById"], json!(model.created_by_id));
        assert_eq!(value["images"], json!(["https://cdn.example.com/w.png"]));
        assert_eq!(value["status"], json!("ACTIVE"));
        assert!(value.get("createdAt").is_some());
        assert!(value["createdBy"].is_null());
    }
}
