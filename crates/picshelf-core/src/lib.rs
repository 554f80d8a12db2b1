//! Picshelf Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! the storage, database, services and API crates.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{NewUser, UploadedFile, User, UserUpdate};
