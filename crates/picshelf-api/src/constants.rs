//! API constants

/// Prefix for every route except the welcome route.
pub const API_PREFIX: &str = "/api/v1";
