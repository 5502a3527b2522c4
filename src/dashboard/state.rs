//! View-model state for the catalog dashboard.
//!
//! The list view holds the loaded products and categories, applies the filter
//! bar and derives summary counts locally. The detail view loads one product
//! and manages an inline edit buffer.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::dashboard::client::{CatalogApi, ClientError};
use crate::handlers::products::{CreateProductRequest, ProductDto, UpdateProductRequest};
use crate::models::ProductStatus;

/// Threshold below which an in-stock product counts as low stock
pub const LOW_STOCK_THRESHOLD: i32 = 50;

pub const DELETE_CONFIRMATION_PROMPT: &str = "Are you sure you want to delete this product?";
pub const DELETE_FORBIDDEN_ALERT: &str = "You are not allowed to delete this product.";
pub const UPDATE_SUCCESS_ALERT: &str = "Product updated successfully!";
pub const UPDATE_FAILED_ALERT: &str = "Failed to update product.";

/// A filter choice that is either "All" or one exact value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: Option<&T>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => value == Some(expected),
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            value.parse().map(Selection::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("All"),
            Selection::Only(value) => fmt::Display::fmt(value, f),
        }
    }
}

/// Filter bar: name substring AND category AND status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: String,
    pub category: Selection<String>,
    pub status: Selection<ProductStatus>,
}

impl ProductFilter {
    pub fn matches(&self, product: &ProductDto) -> bool {
        let needle = self.search.to_lowercase();
        product.name.to_lowercase().contains(&needle)
            && self.category.matches(product.category.as_ref())
            && self.status.matches(Some(&product.status))
    }

    pub fn apply<'a>(&self, products: &'a [ProductDto]) -> Vec<&'a ProductDto> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Summary counts derived from the loaded product list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    pub active: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

impl CatalogStats {
    pub fn compute(products: &[ProductDto]) -> Self {
        products.iter().fold(Self::default(), |mut stats, product| {
            stats.total += 1;
            if product.status == ProductStatus::Active {
                stats.active += 1;
            }
            if product.stock > 0 && product.stock < LOW_STOCK_THRESHOLD {
                stats.low_stock += 1;
            }
            if product.stock == 0 {
                stats.out_of_stock += 1;
            }
            stats
        })
    }
}

/// Fields of the "add product" modal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProductForm {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub stock: i32,
    pub unit: String,
    pub dimension: String,
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl NewProductForm {
    pub fn to_request(&self) -> CreateProductRequest {
        CreateProductRequest {
            name: self.name.trim().to_string(),
            description: non_blank(&self.description),
            category: non_blank(&self.category),
            unit: non_blank(&self.unit),
            price: Some(self.price),
            stock: Some(self.stock),
            dimension: non_blank(&self.dimension),
            ..Default::default()
        }
    }
}

/// Result of a delete interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
    Failed,
}

/// State of the product list page
pub struct ProductListState<C> {
    client: C,
    pub products: Vec<ProductDto>,
    pub categories: Vec<String>,
    pub filter: ProductFilter,
    pub form: NewProductForm,
    pub show_modal: bool,
    pub loading: bool,
    alert: Option<String>,
}

impl<C: CatalogApi> ProductListState<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            products: Vec::new(),
            categories: Vec::new(),
            filter: ProductFilter::default(),
            form: NewProductForm::default(),
            show_modal: false,
            loading: true,
            alert: None,
        }
    }

    /// Fetches products and categories concurrently.
    ///
    /// Each fetch is applied independently; the first failure is returned after
    /// both have completed.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let (products, categories) =
            tokio::join!(self.client.list_products(), self.client.list_categories());
        self.loading = false;

        let mut first_error = None;

        match products {
            Ok(products) => self.products = products,
            Err(err) => {
                tracing::error!(error = %err, "Error fetching products");
                first_error = Some(err);
            }
        }

        match categories {
            Ok(categories) => self.categories = categories,
            Err(err) => {
                tracing::error!(error = %err, "Error fetching categories");
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    pub fn filtered(&self) -> Vec<&ProductDto> {
        self.filter.apply(&self.products)
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats::compute(&self.products)
    }

    pub fn open_modal(&mut self) {
        self.show_modal = true;
    }

    pub fn close_modal(&mut self) {
        self.show_modal = false;
    }

    /// Creates the product described by the form, then refetches the full list.
    pub async fn submit_new_product(&mut self) -> Result<(), ClientError> {
        let request = self.form.to_request();

        if let Err(err) = self.client.create_product(&request).await {
            tracing::error!(error = %err, "Error adding product");
            return Err(err);
        }

        self.close_modal();
        self.form = NewProductForm::default();

        self.products = self.client.list_products().await.inspect_err(|err| {
            tracing::error!(error = %err, "Error refreshing products");
        })?;

        Ok(())
    }

    /// Deletes a product after `confirm` approves the prompt, removing it locally on success.
    pub async fn delete_product<F>(&mut self, id: Uuid, confirm: F) -> DeleteOutcome
    where
        F: FnOnce(&str) -> bool,
    {
        if !confirm(DELETE_CONFIRMATION_PROMPT) {
            return DeleteOutcome::Cancelled;
        }

        match self.client.delete_product(id).await {
            Ok(_) => {
                self.products.retain(|p| p.id != id);
                DeleteOutcome::Deleted
            }
            Err(err) => {
                tracing::error!(error = %err, product_id = %id, "Error deleting product");
                let alert = match &err {
                    ClientError::Api { status: 403, .. } => DELETE_FORBIDDEN_ALERT.to_string(),
                    ClientError::Api { message, .. } => {
                        format!("Failed to delete product: {}", message)
                    }
                    _ => "Failed to delete product.".to_string(),
                };
                self.alert = Some(alert);
                DeleteOutcome::Failed
            }
        }
    }

    /// Returns and clears the pending user-facing alert.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }
}

/// Edit buffer for the detail page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductEdit {
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

impl From<&ProductDto> for ProductEdit {
    fn from(product: &ProductDto) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            unit: product.unit.clone(),
            price: product.price,
            stock: product.stock,
            dimension: product.dimension.clone(),
            status: product.status,
            images: product.images.clone(),
        }
    }
}

impl ProductEdit {
    /// Only editable attributes; identity, ownership and timestamps are never sent.
    pub fn to_request(&self) -> UpdateProductRequest {
        UpdateProductRequest {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            category: Some(self.category.clone()),
            unit: Some(self.unit.clone()),
            price: Some(self.price),
            stock: Some(self.stock),
            dimension: Some(self.dimension.clone()),
            status: Some(self.status),
            images: Some(self.images.clone()),
        }
    }
}

/// State of the product detail page
pub struct ProductDetailState<C> {
    client: C,
    pub product: Option<ProductDto>,
    pub loading: bool,
    edit: Option<ProductEdit>,
    alert: Option<String>,
}

impl<C: CatalogApi> ProductDetailState<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            product: None,
            loading: true,
            edit: None,
            alert: None,
        }
    }

    pub async fn load(&mut self, id: Uuid) -> Result<(), ClientError> {
        let result = self.client.get_product(id).await;
        self.loading = false;

        match result {
            Ok(product) => {
                self.product = Some(product);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, product_id = %id, "Error fetching product");
                Err(err)
            }
        }
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// Preloads the edit buffer with the displayed product. No-op until a product is loaded.
    pub fn begin_edit(&mut self) {
        if let Some(product) = &self.product {
            self.edit = Some(ProductEdit::from(product));
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    pub fn edit_mut(&mut self) -> Option<&mut ProductEdit> {
        self.edit.as_mut()
    }

    /// Submits the edit buffer and replaces the displayed product with the server's copy.
    pub async fn save(&mut self) -> Result<(), ClientError> {
        let (Some(product), Some(edit)) = (&self.product, &self.edit) else {
            return Ok(());
        };
        let id = product.id;
        let request = edit.to_request();

        match self.client.update_product(id, &request).await {
            Ok(updated) => {
                self.product = Some(updated);
                self.edit = None;
                self.alert = Some(UPDATE_SUCCESS_ALERT.to_string());
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, product_id = %id, "Error updating product");
                self.alert = Some(UPDATE_FAILED_ALERT.to_string());
                Err(err)
            }
        }
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn product(name: &str, category: Option<&str>, stock: i32, status: ProductStatus) -> ProductDto {
        ProductDto {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            category: category.map(str::to_string),
            unit: None,
            price: 1.0,
            stock,
            dimension: None,
            status,
            images: Vec::new(),
            organization_id: Uuid::nil(),
            created_by_id: Uuid::nil(),
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
            created_by: None,
        }
    }

    #[derive(Default)]
    struct FakeApi {
        products: Mutex<Vec<ProductDto>>,
        categories: Vec<String>,
        fail_categories: bool,
        delete_status: Option<u16>,
        created: Mutex<Vec<CreateProductRequest>>,
        updates: Mutex<Vec<UpdateProductRequest>>,
    }

    fn api_error(status: u16, message: &str) -> ClientError {
        ClientError::Api {
            status,
            code: "ERR".to_string(),
            message: message.to_string(),
        }
    }

    #[async_trait]
    impl CatalogApi for FakeApi {
        async fn list_products(&self) -> Result<Vec<ProductDto>, ClientError> {
            Ok(self.products.lock().unwrap().clone())
        }

        async fn list_categories(&self) -> Result<Vec<String>, ClientError> {
            if self.fail_categories {
                return Err(api_error(500, "boom"));
            }
            Ok(self.categories.clone())
        }

        async fn get_product(&self, id: Uuid) -> Result<ProductDto, ClientError> {
            self.products
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| api_error(404, "Product not found"))
        }

        async fn create_product(
            &self,
            request: &CreateProductRequest,
        ) -> Result<ProductDto, ClientError> {
            self.created.lock().unwrap().push(request.clone());
            let created = product(&request.name, request.category.as_deref(), 0, ProductStatus::Active);
            self.products.lock().unwrap().insert(0, created.clone());
            Ok(created)
        }

        async fn update_product(
            &self,
            id: Uuid,
            request: &UpdateProductRequest,
        ) -> Result<ProductDto, ClientError> {
            self.updates.lock().unwrap().push(request.clone());
            let mut updated = self.get_product(id).await?;
            if let Some(name) = &request.name {
                updated.name = format!("{} (saved)", name);
            }
            Ok(updated)
        }

        async fn delete_product(&self, _id: Uuid) -> Result<String, ClientError> {
            match self.delete_status {
                Some(status) => Err(api_error(status, "Not authorized to delete this product")),
                None => Ok("Product deleted".to_string()),
            }
        }
    }

    #[test]
    fn stats_follow_stock_thresholds() {
        let products = vec![
            product("a", None, 0, ProductStatus::Active),
            product("b", None, 10, ProductStatus::Inactive),
            product("c", None, 60, ProductStatus::Active),
        ];

        let stats = CatalogStats::compute(&products);
        assert_eq!(
            stats,
            CatalogStats {
                total: 3,
                active: 2,
                low_stock: 1,
                out_of_stock: 1,
            }
        );
    }

    #[test]
    fn low_stock_excludes_boundary() {
        let products = vec![product("a", None, 50, ProductStatus::Active)];
        assert_eq!(CatalogStats::compute(&products).low_stock, 0);
    }

    #[test]
    fn filter_combines_name_category_and_status() {
        let products = vec![
            product("Organic Almonds", Some("Food"), 5, ProductStatus::Active),
            product("Almond Milk", Some("Drinks"), 5, ProductStatus::Active),
            product("Salted Almonds", Some("Food"), 5, ProductStatus::Archived),
        ];

        let filter = ProductFilter {
            search: "ALMOND".to_string(),
            category: Selection::Only("Food".to_string()),
            status: Selection::Only(ProductStatus::Active),
        };

        let names: Vec<&str> = filter
            .apply(&products)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Organic Almonds"]);

        assert_eq!(ProductFilter::default().apply(&products).len(), 3);
    }

    #[test]
    fn category_filter_never_matches_uncategorized() {
        let filter = ProductFilter {
            category: Selection::Only("Food".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&product("x", None, 1, ProductStatus::Active)));
    }

    #[test]
    fn selection_parses_all_case_insensitively() {
        assert_eq!("All".parse::<Selection<String>>().unwrap(), Selection::All);
        assert_eq!(
            "archived".parse::<Selection<ProductStatus>>().unwrap(),
            Selection::Only(ProductStatus::Archived)
        );
    }

    #[test]
    fn form_drops_blank_labels() {
        let form = NewProductForm {
            name: " Widget ".to_string(),
            category: "   ".to_string(),
            price: 10.0,
            stock: 5,
            ..Default::default()
        };

        let request = form.to_request();
        assert_eq!(request.name, "Widget");
        assert_eq!(request.category, None);
        assert_eq!(request.price, Some(10.0));
    }

    #[tokio::test]
    async fn load_applies_products_even_when_categories_fail() {
        let api = FakeApi {
            products: Mutex::new(vec![product("a", None, 1, ProductStatus::Active)]),
            fail_categories: true,
            ..Default::default()
        };
        let mut state = ProductListState::new(api);

        assert!(state.load().await.is_err());
        assert!(!state.loading);
        assert_eq!(state.products.len(), 1);
        assert!(state.categories.is_empty());
    }

    #[tokio::test]
    async fn submit_resets_form_and_refetches() {
        let mut state = ProductListState::new(FakeApi::default());
        state.load().await.unwrap();
        state.open_modal();
        state.form.name = "Widget".to_string();

        state.submit_new_product().await.unwrap();

        assert!(!state.show_modal);
        assert_eq!(state.form, NewProductForm::default());
        assert_eq!(state.products.len(), 1);
        assert_eq!(state.products[0].name, "Widget");
    }

    #[tokio::test]
    async fn cancelled_delete_keeps_product() {
        let existing = product("a", None, 1, ProductStatus::Active);
        let id = existing.id;
        let api = FakeApi {
            products: Mutex::new(vec![existing]),
            ..Default::default()
        };
        let mut state = ProductListState::new(api);
        state.load().await.unwrap();

        let outcome = state
            .delete_product(id, |prompt| {
                assert_eq!(prompt, DELETE_CONFIRMATION_PROMPT);
                false
            })
            .await;

        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(state.products.len(), 1);
    }

    #[tokio::test]
    async fn successful_delete_removes_locally() {
        let keep = product("keep", None, 1, ProductStatus::Active);
        let remove = product("remove", None, 1, ProductStatus::Active);
        let id = remove.id;
        let api = FakeApi {
            products: Mutex::new(vec![keep, remove]),
            ..Default::default()
        };
        let mut state = ProductListState::new(api);
        state.load().await.unwrap();

        assert_eq!(state.delete_product(id, |_| true).await, DeleteOutcome::Deleted);
        assert_eq!(state.products.len(), 1);
        assert_eq!(state.products[0].name, "keep");
        assert!(state.take_alert().is_none());
    }

    #[tokio::test]
    async fn forbidden_delete_raises_alert() {
        let existing = product("a", None, 1, ProductStatus::Active);
        let id = existing.id;
        let api = FakeApi {
            products: Mutex::new(vec![existing]),
            delete_status: Some(403),
            ..Default::default()
        };
        let mut state = ProductListState::new(api);
        state.load().await.unwrap();

        assert_eq!(state.delete_product(id, |_| true).await, DeleteOutcome::Failed);
        assert_eq!(state.products.len(), 1);
        assert_eq!(state.take_alert().as_deref(), Some(DELETE_FORBIDDEN_ALERT));
        assert!(state.take_alert().is_none());
    }

    #[tokio::test]
    async fn detail_save_sends_editable_fields_and_replaces_product() {
        let existing = product("Widget", Some("Tools"), 3, ProductStatus::Active);
        let id = existing.id;
        let api = FakeApi {
            products: Mutex::new(vec![existing]),
            ..Default::default()
        };
        let mut state = ProductDetailState::new(api);
        state.load(id).await.unwrap();

        state.begin_edit();
        assert!(state.is_editing());
        let edit = state.edit_mut().unwrap();
        assert_eq!(edit.category.as_deref(), Some("Tools"));
        edit.name = "Gadget".to_string();
        edit.stock = 7;

        state.save().await.unwrap();

        assert!(!state.is_editing());
        assert_eq!(state.product.as_ref().unwrap().name, "Gadget (saved)");
        assert_eq!(state.take_alert().as_deref(), Some(UPDATE_SUCCESS_ALERT));

        let sent = state.client.updates.lock().unwrap()[0].clone();
        assert_eq!(sent.name.as_deref(), Some("Gadget"));
        assert_eq!(sent.stock, Some(7));
        assert_eq!(sent.category, Some(Some("Tools".to_string())));
    }

    #[tokio::test]
    async fn cancel_edit_discards_buffer() {
        let existing = product("Widget", None, 3, ProductStatus::Active);
        let id = existing.id;
        let api = FakeApi {
            products: Mutex::new(vec![existing]),
            ..Default::default()
        };
        let mut state = ProductDetailState::new(api);
        state.load(id).await.unwrap();

        state.begin_edit();
        state.edit_mut().unwrap().name = "Changed".to_string();
        state.cancel_edit();

        assert!(!state.is_editing());
        assert_eq!(state.product.as_ref().unwrap().name, "Widget");
    }
}
