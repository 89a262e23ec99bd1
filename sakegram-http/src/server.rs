use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use sakegram::dispatcher::DEFAULT_DISPATCH_INTERVAL;
use sakegram::store::DEFAULT_POST_LIMIT;
use sakegram::{GraphPublisher, PostStore, SettingsStore};
use sakegram_graph::GraphConfig;
use sakegram_media::MediaEndpoints;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::generate_hex_key;
use crate::handlers::{
    analyze_sake, auth_status, clean_background, delete_post, generate_background, get_config,
    health, label_export, list_posts, login, retry_post, schedule_post, update_config, AppState,
};
use crate::middleware::require_auth;
use crate::openapi::ApiDoc;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    /// `.env` style file holding the integration settings.
    pub settings_file: PathBuf,
    pub uploads_dir: PathBuf,
    /// Built front-end; served with an `index.html` fallback when present.
    pub dist_dir: PathBuf,
    pub post_limit: usize,
    pub dispatch_interval: Duration,
    pub max_body_mb: usize,
    pub production: bool,
}

impl ServerConfig {
    /// Defaults with every file kept under `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            settings_file: data_dir.join(".env"),
            uploads_dir: data_dir.join("uploads"),
            dist_dir: PathBuf::from("dist"),
            post_limit: DEFAULT_POST_LIMIT,
            dispatch_interval: DEFAULT_DISPATCH_INTERVAL,
            max_body_mb: 25,
            production: false,
            data_dir,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Optional: SAKEGRAM_DATA_DIR (default `.`), SAKEGRAM_BIND_ADDR (else
    /// `0.0.0.0:$PORT`, PORT defaulting to 3001), SAKEGRAM_SETTINGS_FILE,
    /// SAKEGRAM_DIST_DIR, SAKEGRAM_POST_LIMIT, SAKEGRAM_DISPATCH_INTERVAL_SECS,
    /// SAKEGRAM_MAX_BODY_MB, SAKEGRAM_ENV
    pub fn from_env() -> Self {
        let data_dir = std::env::var("SAKEGRAM_DATA_DIR").unwrap_or_else(|_| ".".to_string());
        let mut config = Self::with_data_dir(data_dir);

        let port: u16 = env_parse("PORT").unwrap_or(DEFAULT_PORT);
        config.bind_addr = std::env::var("SAKEGRAM_BIND_ADDR")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("0.0.0.0:{}", port));

        if let Some(path) = env_path("SAKEGRAM_SETTINGS_FILE") {
            config.settings_file = path;
        }
        if let Some(path) = env_path("SAKEGRAM_DIST_DIR") {
            config.dist_dir = path;
        }
        if let Some(limit) = env_parse("SAKEGRAM_POST_LIMIT") {
            config.post_limit = limit;
        }
        if let Some(secs) = env_parse::<u64>("SAKEGRAM_DISPATCH_INTERVAL_SECS").filter(|s| *s > 0) {
            config.dispatch_interval = Duration::from_secs(secs);
        }
        if let Some(mb) = env_parse("SAKEGRAM_MAX_BODY_MB") {
            config.max_body_mb = mb;
        }
        config.production = std::env::var("SAKEGRAM_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        config
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db.json")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Full application router: API, static uploads, OpenAPI docs and the
/// front-end fallback.
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/login", post(login))
        .route("/api/auth-status", get(auth_status))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/schedule", post(schedule_post))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/:id", delete(delete_post))
        .route("/api/posts/:id/retry", post(retry_post))
        .route("/api/analyze-sake", post(analyze_sake))
        .route("/api/generate-background", post(generate_background))
        .route("/api/clean-background", post(clean_background))
        .route("/api/label-export", post(label_export))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    let app = Router::new()
        .merge(public)
        .merge(protected)
        .merge(swagger)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir));

    let dist = config.dist_dir.clone();
    let app = if dist.join("index.html").exists() {
        tracing::info!("Serving front-end from {}", dist.display());
        app.fallback(move |request: Request| {
            let dist = dist.clone();
            async move { spa_fallback(&dist, request).await }
        })
    } else {
        tracing::info!(
            "Front-end not found at {}, serving API only",
            dist.display()
        );
        app.fallback(not_found)
    };

    app.layer(DefaultBodyLimit::max(config.max_body_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
}

/// Static front-end with `index.html` for client-side routes. API and
/// upload paths never fall back to HTML.
async fn spa_fallback(dist: &Path, request: Request) -> Response {
    let path = request.uri().path();
    if path.starts_with("/api/") || path.starts_with("/uploads/") {
        return not_found().await.into_response();
    }

    let service = ServeDir::new(dist).fallback(ServeFile::new(dist.join("index.html")));
    match service.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found", "code": "not_found" })),
    )
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env();
    let settings = Arc::new(SettingsStore::load(&config.settings_file)?);
    let password_set = settings.snapshot().app_password.is_some();

    if config.production && !password_set {
        eprintln!("ERROR: APP_PASSWORD is required in production mode.");
        eprintln!("Suggested password: {}", generate_hex_key());
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if password_set {
        tracing::info!("Password authentication enabled");
    } else {
        tracing::warn!("No APP_PASSWORD set, all routes are unprotected.");
        tracing::warn!("Set SAKEGRAM_ENV=production to enforce a password.");
    }

    let store = Arc::new(PostStore::open(config.db_path())?);
    let pruned = store.prune(config.post_limit)?;
    if pruned > 0 {
        tracing::info!("Pruned {} posts on startup", pruned);
    }
    std::fs::create_dir_all(&config.uploads_dir)?;

    let publisher = Arc::new(GraphPublisher::new(GraphConfig::from_env()));
    let state = Arc::new(AppState::new(
        store,
        settings,
        publisher,
        MediaEndpoints::from_env(),
        config.uploads_dir.clone(),
        config.post_limit,
    ));

    let dispatcher = Arc::clone(&state.dispatcher);
    let interval = config.dispatch_interval;
    tokio::spawn(async move {
        dispatcher.run(interval).await;
    });
    tracing::info!(
        "[dispatch] Checking for due posts every {}s",
        interval.as_secs()
    );

    let app = build_router(state, &config);

    tracing::info!("Starting Sakegram server on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
