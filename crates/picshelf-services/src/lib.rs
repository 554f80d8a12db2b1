//! Picshelf Services Layer
//!
//! Background jobs that coordinate the blob store and the user directory. HTTP
//! handling stays in picshelf-api.

pub mod reconcile;

pub use reconcile::{ReconcileError, ReconcileReport, ReconcileService};
