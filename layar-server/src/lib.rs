//! # Layar Server
//!
//! HTTP API over the Layar movie catalog.
//!
//! - `GET /api/movies` lists records with search, filters, sorting and
//!   pagination, optionally enriching a capped prefix with TMDB metadata
//! - `GET /api/movies/{slug}` returns one record, enriched by default
//! - `GET /ping` and `GET /health` report liveness and store health
//!
//! The binary also carries the database tooling (`db setup`, `db import`,
//! `db migrate`, `db enrich`).

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::{
    Router,
    http::{HeaderName, Method},
    routing::get,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use layar_config::CorsConfig;

pub fn create_app(state: AppState) -> Router {
    let cors_layer = if state.config().dev_mode {
        CorsLayer::permissive()
    } else {
        cors_layer(&state.config().cors)
    };

    Router::new()
        .route("/ping", get(handlers::health::ping_handler))
        .route("/health", get(handlers::health::health_handler))
        .merge(routes::create_api_router())
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.is_wildcard_included() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            cors.allowed_origins
                .iter()
                .filter_map(|s| axum::http::HeaderValue::from_str(s).ok()),
        )
    };

    // Methods and headers are validated when the config is loaded.
    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
        .collect();
    let headers: Vec<HeaderName> = cors
        .allowed_headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers))
}
