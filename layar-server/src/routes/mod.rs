pub mod movies;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn create_api_router() -> Router<AppState> {
    Router::new().nest("/api", movies::create_movies_router())
}
