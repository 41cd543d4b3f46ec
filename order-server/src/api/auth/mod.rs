//! Auth API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/auth", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Public
        .route("/register", post(handler::register))
        .route("/login", post(handler::login))
        // Authenticated
        .route("/me", get(handler::me))
        .route("/password", put(handler::change_password))
}
