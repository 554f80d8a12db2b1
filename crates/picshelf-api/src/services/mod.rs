//! Request-path services

pub mod upload;
