use axum::{routing::delete, routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(handlers::sign_up))
        .route("/auth/sign-in", post(handlers::sign_in))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(handlers::get_me))
        .route("/users/me", put(handlers::update_me))
        .route("/users/me/avatar", put(handlers::update_avatar))
        .route("/users/me/likes", get(handlers::list_my_likes))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/posts", get(handlers::list_user_posts))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", get(handlers::list_posts))
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", put(handlers::update_post))
        .route("/posts/:id", delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::like_post))
        .route("/posts/:id/like", delete(handlers::unlike_post))
        .route("/posts/:id/comments", get(handlers::list_comments))
        .route("/posts/:id/comments", post(handlers::create_comment))
        .route(
            "/posts/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
}

pub fn categories() -> Router<AppState> {
    Router::new()
        .route("/categories", get(handlers::list_categories))
        .route("/categories/:id", get(handlers::get_category))
}

pub fn moderation() -> Router<AppState> {
    Router::new()
        .route("/moderation/posts", get(handlers::list_pending_posts))
        .route("/moderation/posts/:id", put(handlers::decide_post))
        .route("/moderation/categories", post(handlers::create_category))
        .route(
            "/moderation/categories/:id",
            put(handlers::update_category),
        )
        .route(
            "/moderation/categories/:id",
            delete(handlers::delete_category),
        )
}
