//! Profile picture upload pipeline: validate → allocate name → write → report.

mod service;

pub use service::{
    IncomingFile, ProfilePicUploadService, MISSING_FILE_MESSAGE, PROFILE_PIC_FIELD,
    TOO_LARGE_MESSAGE,
};
