//! HTTP handlers

pub mod health;
pub mod profile_pic;
pub mod users;

use picshelf_core::AppError;
use serde::Serialize;

/// `{success, msg}` envelope returned by every mutating route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_name: Option<String>,
}

impl MessageResponse {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            success: true,
            msg: msg.into(),
            storage_name: None,
        }
    }
}

/// Parse a `{userId}` path segment.
pub(crate) fn parse_user_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("invalid userId provided!".to_string()))
}

pub(crate) fn user_not_found() -> AppError {
    AppError::NotFound("user not found!".to_string())
}
