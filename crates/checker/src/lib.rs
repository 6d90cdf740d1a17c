//! `queuewatch-checker` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod auth;
pub mod dispatch;
pub mod probe;
pub mod runner;
