use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::infra::app_state::AppState;

pub async fn ping_handler() -> Json<Value> {
    info!("Ping endpoint called");
    Json(json!({
        "status": "ok",
        "message": "Layar movie API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<Value>) {
    let mut health_status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "enrichment": {
                "enabled": state.enricher.is_some(),
            }
        }
    });

    let status = match state.store.health_check().await {
        Ok(()) => {
            health_status["checks"]["store"] = json!({
                "status": "healthy",
                "backend": state.store.backend(),
            });
            StatusCode::OK
        }
        Err(err) => {
            error!(error = %err, backend = state.store.backend(), "store health check failed");
            health_status["status"] = json!("unhealthy");
            health_status["checks"]["store"] = json!({
                "status": "unhealthy",
                "backend": state.store.backend(),
                "error": err.to_string(),
            });
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status, Json(health_status))
}
