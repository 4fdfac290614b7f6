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
        .route("/create", post(handlers::create_room))
        .route("/update/:id", patch(handlers::update_room))
        .route("/delete/:id", delete(handlers::delete_room))
        .route("/allRooms", get(handlers::all_rooms))
        .route("/myRooms", get(handlers::my_rooms))
}
