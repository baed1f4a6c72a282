use axum::{Router, routing::get};

use crate::{AppState, handlers::movies};

pub fn create_movies_router() -> Router<AppState> {
    Router::new()
        .route("/movies", get(movies::list_movies))
        .route("/movies/{slug}", get(movies::get_movie))
}
