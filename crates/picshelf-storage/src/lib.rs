//! Picshelf Storage Library
//!
//! Blob storage for uploaded profile pictures. Files live in a single flat directory
//! (the storage root) and are addressed by their storage name, which is also the file
//! name on disk.
//!
//! # Storage name format
//!
//! `<unixMillis>-<sanitizedOriginalName>`, produced by [`NameAllocator`]. When two uploads
//! collide on the same name, a disambiguated form `<unixMillis>-<token>-<sanitizedOriginalName>`
//! is used instead. Names never contain path separators.

pub mod local;
pub mod naming;
pub mod traits;

// Re-export commonly used types
pub use local::LocalStorage;
pub use naming::{sanitize_original_name, Clock, FixedClock, NameAllocator, SystemClock};
pub use traits::{BlobReader, Storage, StorageError, StorageResult};
