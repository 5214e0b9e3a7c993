/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskshare_api::{app::AppState, config::Config};
/// use taskshare_shared::store::memory::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = taskshare_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::{Config, StorageBackend};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use taskshare_shared::auth::middleware::authenticate_headers;
use taskshare_shared::db::{
    migrations::run_migrations,
    pool::{create_pool, DatabaseConfig},
};
use taskshare_shared::services::Services;
use taskshare_shared::store::{memory::MemoryStore, postgres::PgDocumentStore, DocumentStore};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Services wired to `store`
    pub services: Services,

    /// Backing document store, kept for health checks
    pub store: Arc<dyn DocumentStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state over `store`
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            services: Services::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }

    /// Opens the configured store and builds state over it
    ///
    /// For Postgres this creates the pool and runs pending migrations.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
            StorageBackend::Postgres => {
                let url = config.storage.database_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL is required for the postgres backend")
                })?;

                let pool = create_pool(DatabaseConfig {
                    url,
                    max_connections: config.storage.max_connections,
                    ..Default::default()
                })
                .await?;
                run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");

                Arc::new(PgDocumentStore::new(pool))
            }
        };

        Ok(Self::new(store, config))
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                        # Store health (public)
/// └── /api/
///     ├── /auth/                         # Public
///     │   ├── POST /register
///     │   └── POST /login
///     ├── GET  /user                     # Own profile
///     ├── /users/
///     │   ├── GET  /search?email=
///     │   └── POST /me/groups/reconcile
///     ├── /tasks/
///     │   ├── GET    /                   # Owned + collaborating
///     │   ├── POST   /
///     │   ├── PUT    /:id
///     │   └── DELETE /:id
///     └── /groups/
///         ├── GET    /                   # Groups the caller belongs to
///         ├── POST   /
///         ├── GET    /:id
///         ├── POST   /:id/members/:user_id
///         └── DELETE /:id/members/:user_id
/// ```
///
/// Everything under `/api` except `/api/auth` requires a bearer JWT.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let protected_routes = Router::new()
        .route("/user", get(routes::users::current_user))
        .route("/users/search", get(routes::users::search_users))
        .route(
            "/users/me/groups/reconcile",
            post(routes::users::reconcile_my_groups),
        )
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route(
            "/groups",
            get(routes::groups::list_groups).post(routes::groups::create_group),
        )
        .route("/groups/:id", get(routes::groups::get_group))
        .route(
            "/groups/:id/members/:user_id",
            post(routes::groups::add_member).delete(routes::groups::remove_member),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// CORS from the configured origins; `*` means permissive
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        if config.api.production {
            tracing::warn!("CORS allows any origin in production");
        }
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer token and injects the
/// [`AuthContext`](taskshare_shared::auth::middleware::AuthContext) into the
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate_headers(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
