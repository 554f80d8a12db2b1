use serde::Serialize;

/// A file accepted by the upload path and written to the storage root.
///
/// Lives only for the duration of the request; the filesystem owns the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub storage_name: String,
    pub original_name: String,
    pub size_bytes: u64,
    pub content_type: String,
}
