use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh-token", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/verify", post(handlers::verify_otp))
        .route("/resendOtp", post(handlers::resend_otp))
        .route("/change-password", patch(handlers::change_password))
        .route("/update", patch(handlers::update_details))
        .route("/delete", delete(handlers::delete_account))
        .route("/details", get(handlers::get_details))
}
