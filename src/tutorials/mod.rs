use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod progress;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/tutorials",
            get(handlers::list_tutorials).post(handlers::create_tutorial),
        )
        .route(
            "/tutorials/:slug",
            get(handlers::get_tutorial)
                .put(handlers::update_tutorial)
                .delete(handlers::delete_tutorial),
        )
        .route("/tutorials/:slug/preview", get(handlers::preview_tutorial))
        .route("/tutorials/:slug/follow", post(handlers::follow_tutorial))
        .route("/tutorials/:slug/complete", post(handlers::complete_tutorial))
        .route("/tutorials/:slug/completed", get(handlers::tutorial_completed))
}
