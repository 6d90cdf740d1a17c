//! Core domain logic for the queuewatch fleet checker.
//!
//! Everything here is synchronous and network-free apart from reading the
//! configuration file, so the whole crate is testable without a server:
//!
//! - [`config`] holds the YAML schema and target normalization.
//! - [`validate`] rejects bad fleet documents before anything is probed.
//! - [`report`] turns measured queue depths into ordered report lines.
//! - [`message`] composes the consolidated alert email.

pub mod config;
pub mod error;
pub mod message;
pub mod report;
pub mod validate;

pub use config::{EmailConfig, FleetConfig, ServerConfig, ServerTarget};
pub use error::ConfigError;
pub use message::EmailEnvelope;
pub use report::{AlertBatch, ReportLine};
