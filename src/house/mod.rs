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
        .route("/create", post(handlers::create_house_service))
        .route("/update/:id", patch(handlers::update_house_service))
        .route("/delete/:id", delete(handlers::delete_house_service))
        .route("/allServices", get(handlers::all_house_services))
        .route("/myServices", get(handlers::my_house_services))
}
