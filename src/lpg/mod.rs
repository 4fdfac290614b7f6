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
        .route("/create", post(handlers::create_lpg_service))
        .route("/update/:id", patch(handlers::update_lpg_service))
        .route("/updateCapacity/:id", patch(handlers::update_lpg_capacity))
        .route("/delete/:id", delete(handlers::delete_lpg_service))
        .route("/allServices", get(handlers::all_lpg_services))
        .route("/myServices", get(handlers::my_lpg_services))
}
