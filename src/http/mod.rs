use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AuthUser, MaybeAuthUser, Moderator};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .merge(routes::auth())
        .merge(routes::users())
        .merge(routes::posts())
        .merge(routes::categories())
        .merge(routes::moderation());

    Router::new()
        .merge(routes::health())
        .nest("/api/v1", api)
        .nest_service("/media", ServeDir::new(state.storage.root()))
        .layer(DefaultBodyLimit::max(state.upload_max_bytes + 64 * 1024))
        .layer(cors)
        .with_state(state)
}
