use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use diesel::r2d2::{self, ConnectionManager};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod config;
pub mod error;
pub mod schema;

pub mod handlers {
    pub mod admin_handlers;
    pub mod auth_middleware;
    pub mod canonical_host;
    pub mod form_dtos;
    pub mod form_handlers;
    pub mod public_handlers;
    pub mod validate_handlers;
}
pub mod api {
    pub mod telegram_bot_api;
}
pub mod models {
    pub mod lead_models;
}
pub mod repositories {
    pub mod lead_repository;
    pub mod metrics_repository;
    pub mod whitelist_repository;
}
pub mod services {
    pub mod handle_resolver;
    pub mod lead_notifier;
}
pub mod utils {
    pub mod lead_format;
    pub mod text;
}
pub mod bot {
    pub mod commands;
}


use config::AppConfig;
use error::AppError;
use handlers::{admin_handlers, form_handlers, public_handlers, validate_handlers};
use repositories::{
    lead_repository::LeadRepository, metrics_repository::MetricsRepository, whitelist_repository::WhitelistRepository,
};
use services::{handle_resolver::HandleResolver, lead_notifier::LeadNotifier};

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct AppState {
    pub config: AppConfig,
    pub lead_repository: Arc<LeadRepository>,
    pub metrics_repository: Arc<MetricsRepository>,
    pub whitelist_repository: Arc<WhitelistRepository>,
    pub handle_resolver: Arc<dyn HandleResolver>,
    pub lead_notifier: Arc<dyn LeadNotifier>,
}

/// Opens the sqlite pool and brings the schema up to date.
pub fn init_pool(database_url: &str, max_size: u32) -> Result<DbPool, AppError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder().max_size(max_size).build(manager)?;

    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;
    Ok(pool)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/leads", get(admin_handlers::list_leads))
        .route("/api/admin/leads/status", post(admin_handlers::update_lead_status))
        .route("/api/admin/leads/meta", post(admin_handlers::update_lead_meta))
        .route("/api/admin/agreements", get(admin_handlers::list_agreements))
        .route("/api/admin/agreements/status", post(admin_handlers::update_agreement_status))
        .route("/api/admin/agreements/amount", post(admin_handlers::update_agreement_amount))
        .route("/api/admin/stats", get(admin_handlers::get_stats))
        .route("/api/admin/export/leads.csv", get(admin_handlers::export_leads))
        .route("/api/admin/export/agreements.csv", get(admin_handlers::export_agreements))
        .route(
            "/api/admin/whitelist",
            get(admin_handlers::list_whitelist).post(admin_handlers::replace_whitelist),
        )
        .route("/api/admin/whitelist/remove", post(admin_handlers::remove_from_whitelist))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::auth_middleware::require_admin,
        ));

    let static_dir = state.config.static_dir.clone();
    let spa = ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/health", get(public_handlers::health_check))
        .route("/robots.txt", get(public_handlers::robots))
        .route("/sitemap.xml", get(public_handlers::sitemap))
        .route("/course-fullstack.html", get(public_handlers::legacy_fullstack))
        .route("/course-datascience.html", get(public_handlers::legacy_data_science))
        .route("/course-business.html", get(public_handlers::legacy_business))
        .route("/course-python-beginners.html", get(public_handlers::legacy_python_beginners))
        .route("/api/contacts", get(public_handlers::contacts))
        .route("/api/metrics/visit", post(public_handlers::record_visit))
        .route("/validate/telegram", get(validate_handlers::validate_telegram))
        .route("/apply", post(form_handlers::apply))
        .route("/enroll", post(form_handlers::enroll))
        .route("/api/admin/login", post(admin_handlers::login))
        .merge(admin_routes)
        .fallback_service(spa)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::canonical_host::enforce_canonical_host,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS])
                .allow_origin(Any)
                .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
                .expose_headers([axum::http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}
