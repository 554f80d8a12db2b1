use crate::error::ErrorResponse;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Msg {
    pub msg: String,
}

pub async fn root() -> Json<Msg> {
    Json(Msg {
        msg: "Welcome to picshelf 😄!".to_string(),
    })
}

pub async fn ping() -> Json<Msg> {
    Json(Msg {
        msg: "🚀".to_string(),
    })
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("route not found", "NOT_FOUND")),
    )
}
