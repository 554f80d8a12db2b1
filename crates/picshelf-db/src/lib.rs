//! Picshelf database layer
//!
//! SQLite connection setup, embedded migrations and the user repository.

pub mod db;

pub use db::pool::{connect, connect_and_migrate, run_migrations};
pub use db::users::{UserDirectory, UserRepository};
