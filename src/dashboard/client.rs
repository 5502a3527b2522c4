//! HTTP client for the Catalog API used by the dashboard.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::handlers::products::{CreateProductRequest, ProductDto, UpdateProductRequest};
use crate::handlers::types::{DataResponse, MessageResponse};

/// Errors returned by [`CatalogClient`]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

/// Operations the dashboard needs from the Catalog API
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_products(&self) -> Result<Vec<ProductDto>, ClientError>;
    async fn list_categories(&self) -> Result<Vec<String>, ClientError>;
    async fn get_product(&self, id: Uuid) -> Result<ProductDto, ClientError>;
    async fn create_product(
        &self,
        request: &CreateProductRequest,
    ) -> Result<ProductDto, ClientError>;
    async fn update_product(
        &self,
        id: Uuid,
        request: &UpdateProductRequest,
    ) -> Result<ProductDto, ClientError>;
    async fn delete_product(&self, id: Uuid) -> Result<String, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    error: Option<String>,
}

/// reqwest-backed [`CatalogApi`] implementation
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl CatalogClient {
    /// Creates a client for the API served at `base_url` (e.g. `http://localhost:3002`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
        })
    }

    /// Sends `token` as a bearer credential on every request.
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.authorize(builder).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        let code = parsed
            .as_ref()
            .and_then(|b| b.code.clone())
            .unwrap_or_else(|| "HTTP_ERROR".to_string());
        let message = parsed
            .and_then(|b| b.error)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        tracing::debug!(status = status.as_u16(), %code, %message, "Catalog API request failed");

        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn list_products(&self) -> Result<Vec<ProductDto>, ClientError> {
        let url = self.url("api/products")?;
        let response: DataResponse<Vec<ProductDto>> = self.send(self.http.get(url)).await?;
        Ok(response.data)
    }

    async fn list_categories(&self) -> Result<Vec<String>, ClientError> {
        let url = self.url("api/products/categories/all")?;
        let response: DataResponse<Vec<String>> = self.send(self.http.get(url)).await?;
        Ok(response.data)
    }

    async fn get_product(&self, id: Uuid) -> Result<ProductDto, ClientError> {
        let url = self.url(&format!("api/products/{}", id))?;
        let response: DataResponse<ProductDto> = self.send(self.http.get(url)).await?;
        Ok(response.data)
    }

    async fn create_product(
        &self,
        request: &CreateProductRequest,
    ) -> Result<ProductDto, ClientError> {
        let url = self.url("api/products")?;
        let response: DataResponse<ProductDto> =
            self.send(self.http.post(url).json(request)).await?;
        Ok(response.data)
    }

    async fn update_product(
        &self,
        id: Uuid,
        request: &UpdateProductRequest,
    ) -> Result<ProductDto, ClientError> {
        let url = self.url(&format!("api/products/{}", id))?;
        let response: DataResponse<ProductDto> =
            self.send(self.http.put(url).json(request)).await?;
        Ok(response.data)
    }

    async fn delete_product(&self, id: Uuid) -> Result<String, ClientError> {
        let url = self.url(&format!("api/products/{}", id))?;
        let response: MessageResponse = self.send(self.http.delete(url)).await?;
        Ok(response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = CatalogClient::new("http://localhost:3002/catalog").unwrap();
        assert_eq!(
            client.url("api/products").unwrap().as_str(),
            "http://localhost:3002/catalog/api/products"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            CatalogClient::new("not a url"),
            Err(ClientError::Url(_))
        ));
    }
}
