use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users).post(handlers::register))
        .route("/users/auth", get(handlers::current_user))
        .route("/users/login", post(handlers::login))
        .route("/users/logout", post(handlers::logout))
        .route("/users/tutorials", get(handlers::my_tutorials))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/:id/change-password", put(handlers::change_password))
        .route(
            "/users/:id/request-password-reset",
            post(handlers::request_password_reset),
        )
        .route(
            "/users/:id/reset-password/:token",
            put(handlers::reset_password),
        )
}
