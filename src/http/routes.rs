use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_current_user))
        .route("/auth/make-admin", post(handlers::make_admin))
        .route("/auth/users", get(handlers::list_users))
}

pub fn notices() -> Router<AppState> {
    Router::new()
        .route(
            "/notice",
            get(handlers::list_notices).post(handlers::create_notice),
        )
        // Published clients of the original API hit the slashed collection
        // path; both spellings stay routable.
        .route(
            "/notice/",
            get(handlers::list_notices).post(handlers::create_notice),
        )
        .route("/notice/cleanup-expired", post(handlers::cleanup_expired))
        .route(
            "/notice/test-notifications",
            post(handlers::test_notifications),
        )
        .route(
            "/notice/:id",
            get(handlers::get_notice)
                .put(handlers::update_notice)
                .delete(handlers::delete_notice),
        )
}
