//! Database repositories for data access layer
//!
//! The service owns a single table, `users`. Other crates reach it either through the
//! concrete `UserRepository` or through the narrower `UserDirectory` trait.

pub mod pool;
pub mod users;
