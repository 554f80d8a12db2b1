//! Storage reconciliation: deletes stored files that no user row references.

mod service;

pub use service::{ReconcileError, ReconcileReport, ReconcileService};
