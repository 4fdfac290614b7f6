use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::create_post))
        .route("/update/:id", patch(handlers::update_post))
        .route("/delete/:id", delete(handlers::delete_post))
        .route("/allPosts", get(handlers::all_posts))
        .route("/myPosts", get(handlers::my_posts))
}
