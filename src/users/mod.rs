use crate::state::AppState;
use axum::{
    routing::{get, put},
    Router,
};

pub mod handlers;
pub mod model;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(handlers::get_me))
        .route("/users/me/photo", put(handlers::put_photo))
}
