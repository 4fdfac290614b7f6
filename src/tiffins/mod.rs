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
        .route("/create", post(handlers::create_tiffin))
        .route("/update/:id", patch(handlers::update_tiffin))
        .route("/delete/:id", delete(handlers::delete_tiffin))
        .route("/allTiffins", get(handlers::all_tiffins))
        .route("/myTiffins", get(handlers::my_tiffins))
}
