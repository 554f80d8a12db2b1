//! Profile picture upload handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use picshelf_core::{UploadedFile, UserUpdate};

use super::{parse_user_id, user_not_found, MessageResponse};
use crate::error::{HttpAppError, ValidatedMultipart};
use crate::state::AppState;

fn uploaded_response(file: UploadedFile) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        msg: "file uploaded successfully!".to_string(),
        storage_name: Some(file.storage_name),
    })
}

/// Store a profile picture without attaching it to a user.
pub async fn upload_profile_pic(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedMultipart(multipart): ValidatedMultipart,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let file = state.uploads.upload(&headers, multipart).await?;
    Ok(uploaded_response(file))
}

/// Store a profile picture and point the user's `profilePic` at it.
///
/// If the user update fails the file stays on disk until the reconciler removes it.
#[tracing::instrument(skip(state, headers, multipart), fields(operation = "upload_user_profile_pic"))]
pub async fn upload_user_profile_pic(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    ValidatedMultipart(multipart): ValidatedMultipart,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let id = parse_user_id(&user_id)?;

    let file = state.uploads.upload(&headers, multipart).await?;

    let update = UserUpdate::profile_pic(file.storage_name.clone());
    if !state.user_repository.update(id, &update).await? {
        tracing::warn!(
            user_id = id,
            storage_name = %file.storage_name,
            "Uploaded file left unreferenced, user does not exist"
        );
        return Err(user_not_found().into());
    }

    Ok(uploaded_response(file))
}
