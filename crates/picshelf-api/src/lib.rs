//! Picshelf API Library
//!
//! HTTP handlers, middleware and application setup for the picshelf service.

pub mod constants;
pub mod error;
mod handlers;
mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
