use std::io::Cursor;
use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::{header::CONTENT_LENGTH, HeaderMap, StatusCode};
use bytes::Bytes;
use picshelf_core::{AppError, UploadedFile};
use picshelf_storage::{NameAllocator, Storage, StorageError};

/// Multipart field carrying the image.
pub const PROFILE_PIC_FIELD: &str = "profilePic";

const MAX_WRITE_ATTEMPTS: usize = 3;

pub const TOO_LARGE_MESSAGE: &str = "failed to parse form data, make sure it's less than 10Mb";
pub const MISSING_FILE_MESSAGE: &str = "error retrieving the file";
const NOT_AN_IMAGE_MESSAGE: &str = "file is not an image";

/// The file part of an upload, read fully into memory (bounded by the body limit).
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    /// Only the client-declared type is checked, not the bytes.
    fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

pub struct ProfilePicUploadService {
    storage: Arc<dyn Storage>,
    allocator: NameAllocator,
    max_bytes: usize,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(TOO_LARGE_MESSAGE.to_string())
    } else {
        tracing::debug!(error = %err.body_text(), "Malformed multipart body");
        AppError::InvalidUpload(MISSING_FILE_MESSAGE.to_string())
    }
}

impl ProfilePicUploadService {
    pub fn new(storage: Arc<dyn Storage>, allocator: NameAllocator, max_bytes: usize) -> Self {
        Self {
            storage,
            allocator,
            max_bytes,
        }
    }

    /// Full pipeline for one request.
    #[tracing::instrument(skip(self, headers, multipart), fields(operation = "upload_profile_pic"))]
    pub async fn upload(
        &self,
        headers: &HeaderMap,
        multipart: Multipart,
    ) -> Result<UploadedFile, AppError> {
        self.check_declared_length(headers)?;
        let file = self.extract(multipart).await?;
        if !file.is_image() {
            return Err(AppError::UnsupportedMediaType(
                NOT_AN_IMAGE_MESSAGE.to_string(),
            ));
        }
        self.store(file).await
    }

    /// Reject a body whose declared length is already over the limit, before reading it.
    pub fn check_declared_length(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let declared = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        match declared {
            Some(len) if len > self.max_bytes as u64 => {
                tracing::debug!(
                    content_length = len,
                    max_bytes = self.max_bytes,
                    "Upload rejected by declared length"
                );
                Err(AppError::PayloadTooLarge(TOO_LARGE_MESSAGE.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Pull the `profilePic` part out of the form. Other fields are skipped.
    pub async fn extract(&self, mut multipart: Multipart) -> Result<IncomingFile, AppError> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(PROFILE_PIC_FIELD) {
                continue;
            }

            let original_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(multipart_error)?;

            return Ok(IncomingFile {
                original_name,
                content_type,
                data,
            });
        }

        Err(AppError::InvalidUpload(MISSING_FILE_MESSAGE.to_string()))
    }

    /// Write the file under a freshly allocated name.
    ///
    /// The write runs in its own task so a dropped request cannot interrupt it halfway.
    pub async fn store(&self, file: IncomingFile) -> Result<UploadedFile, AppError> {
        let storage = self.storage.clone();
        let allocator = self.allocator.clone();
        let original_name = file.original_name.clone();
        let data = file.data.clone();

        let written = tokio::spawn(async move {
            write_exclusive(storage.as_ref(), &allocator, &original_name, data).await
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Upload write task did not complete");
            AppError::StorageWriteFailed(format!("Upload write task failed: {}", e))
        })?;

        match written {
            Ok((storage_name, size_bytes)) => {
                tracing::info!(
                    storage_name = %storage_name,
                    original_name = %file.original_name,
                    size_bytes,
                    "Profile picture stored"
                );
                Ok(UploadedFile {
                    storage_name,
                    original_name: file.original_name,
                    size_bytes,
                    content_type: file.content_type.unwrap_or_default(),
                })
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    original_name = %file.original_name,
                    "Failed to store profile picture"
                );
                Err(AppError::StorageWriteFailed(e.to_string()))
            }
        }
    }
}

/// Create the object, falling back to disambiguated names when the plain name is taken.
async fn write_exclusive(
    storage: &dyn Storage,
    allocator: &NameAllocator,
    original_name: &str,
    data: Bytes,
) -> Result<(String, u64), StorageError> {
    let mut name = allocator.allocate(original_name);
    let mut attempt = 1;

    loop {
        match storage
            .put_stream(&name, Box::pin(Cursor::new(data.clone())))
            .await
        {
            Ok(size) => return Ok((name, size)),
            Err(StorageError::AlreadyExists(taken)) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(storage_name = %taken, attempt, "Storage name taken, retrying");
                name = allocator.allocate_disambiguated(original_name);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
