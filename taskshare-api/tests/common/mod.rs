/// Common test utilities for integration tests
///
/// Every context gets its own in-memory store, so tests never share state.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskshare_api::app::{build_router, AppState};
use taskshare_api::config::{ApiConfig, Config, JwtConfig, StorageBackend, StorageConfig};
use taskshare_shared::auth::jwt::{create_token, Claims};
use taskshare_shared::models::user::NewUser;
use taskshare_shared::store::memory::MemoryStore;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

pub const PASSWORD: &str = "Passw0rd!";

/// A registered user plus a valid bearer token
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test context containing the router and its backing store
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), test_config());
        let app = build_router(state.clone());

        Self { app, state, store }
    }

    /// Registers `username` through the service layer and mints a token
    pub async fn user(&self, username: &str) -> TestUser {
        let profile = self
            .state
            .services
            .users
            .register(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: PASSWORD.to_string(),
                role: None,
            })
            .await
            .expect("registration should succeed");

        let token = create_token(&Claims::new(profile.id.clone()), JWT_SECRET)
            .expect("token creation should succeed");

        TestUser {
            id: profile.id,
            username: profile.username,
            token,
        }
    }

    /// Sends a request and returns the status and JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", user.auth_header());
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, body)
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            database_url: None,
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            access_ttl_minutes: 60,
        },
    }
}
