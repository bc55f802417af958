//! fmodata - a small service in front of a FileMaker OData database
//!
//! This crate provides both a library and binaries for running the service.
//!
//! # Client Usage
//!
//! ```rust,no_run
//! use fmodata_rs::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new(ClientConfig::new("https://fms.example.com", "Sales", "api", "secret"))?;
//!     client.ping().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Server Usage
//!
//! Run the binary to start the REST API server (reads `config.json`):
//! ```bash
//! fmodata-server
//! ```

pub use fmodata_core;
pub use fmodata_rs;

pub mod api;
pub mod error;
pub mod middleware;
pub mod migrate;
pub mod telemetry;

/// Name reported by the health endpoint
pub const SERVICE_NAME: &str = "fmodata";

/// Sent as `X-Version` on every response
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
