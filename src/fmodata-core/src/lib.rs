//! fmodata Core Library
//!
//! This crate provides the pieces shared by the OData client and the service:
//! - Wire models for the FileMaker OData API (tables, fields, records, scripts)
//! - Service configuration
//! - Request-log storage

pub mod config;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::{Config, OdataSettings};
pub use models::*;
pub use store::{RequestLog, SqliteLogStore};
