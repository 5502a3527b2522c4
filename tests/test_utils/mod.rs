//! Test utilities for database and API testing.
//!
//! Provides an in-memory SQLite database with migrations applied, fixture
//! helpers for organizations and users, and a router harness that drives the
//! Catalog API with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use catalog::{
    auth,
    config::{AppConfig, IdLookupScope},
    models::{organization, user},
    server::{AppState, create_app},
};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret";

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool is pinned to a single connection so every query sees the same
/// in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Inserts an organization and returns its id.
pub async fn insert_organization(db: &DatabaseConnection, name: &str) -> Result<Uuid> {
    let organization = organization::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(organization.id)
}

/// Inserts a user in `organization_id` and returns its id.
pub async fn insert_user(
    db: &DatabaseConnection,
    organization_id: Uuid,
    name: &str,
    is_super_admin: bool,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        organization_id: Set(organization_id),
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", id)),
        password_hash: Set(None),
        is_super_admin: Set(is_super_admin),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(id)
}

/// Configuration used by API tests.
pub fn test_config(scope: IdLookupScope) -> AppConfig {
    AppConfig {
        jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        id_lookup_scope: scope,
        ..Default::default()
    }
}

/// An authenticated identity for API tests.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

impl Actor {
    pub fn token(&self) -> String {
        auth::issue_token(TEST_JWT_SECRET, self.user_id, self.organization_id, 3600)
            .expect("token should be issued")
    }
}

/// Creates an organization with one user in it.
pub async fn create_actor(
    db: &DatabaseConnection,
    organization_name: &str,
    is_super_admin: bool,
) -> Result<Actor> {
    let organization_id = insert_organization(db, organization_name).await?;
    let user_id = insert_user(db, organization_id, "Test User", is_super_admin).await?;
    Ok(Actor {
        user_id,
        organization_id,
    })
}

/// Router plus the database it is wired to.
pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub trace_id: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub async fn new(scope: IdLookupScope) -> Result<Self> {
        let db = setup_test_db().await?;
        let router = create_app(AppState::new(test_config(scope), db.clone()));
        Ok(Self { router, db })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        actor: Option<&Actor>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(actor) = actor {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", actor.token()));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let trace_id = response
            .headers()
            .get("x-trace-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            trace_id,
            body,
        }
    }
}
