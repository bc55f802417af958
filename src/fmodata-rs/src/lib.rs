//! fmodata Client Library
//!
//! HTTP client for the FileMaker Server OData API: schema changes, record
//! CRUD, container field transfer and script invocation, all over Basic Auth.
//!
//! ```rust,no_run
//! use fmodata_rs::{Client, ClientConfig};
//!
//! # async fn run() -> fmodata_rs::Result<()> {
//! let client = Client::new(ClientConfig::new("https://fms.example.com", "Sales", "api", "secret"))?;
//! client.ping().await?;
//! let open = client.list("Invoices", &[("$filter", "Status eq 'Open'")]).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod container;
mod records;
mod schema;
mod scripts;

pub use client::{basic_auth_header, encode_query, entity_segment, Client};
pub use fmodata_core::models::{
    ClientConfig, FieldDefinition, FieldType, ODataError, ODataResponse, Record, ScriptResult,
    TableDefinition,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The exchange itself failed: DNS, connect, TLS or timeout
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The payload could not be encoded; nothing was sent
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The service answered with a status the operation does not accept
    #[error("OData request failed with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// A success body did not have the expected shape
    #[error("Invalid response from server: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to read content: {0}")]
    Io(#[from] std::io::Error),

    /// Host and database do not form a usable base URL
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Status code of a remote error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Request(e) if e.is_timeout())
    }

    /// Structured view of a remote error body, when it is the usual envelope
    pub fn odata_error(&self) -> Option<ODataError> {
        match self {
            ClientError::Remote { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_accessors() {
        let err = ClientError::Remote {
            status: 404,
            body: r#"{"error":{"code":"-1023","message":"Record is missing"}}"#.to_string(),
        };

        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
        let odata = err.odata_error().unwrap();
        assert_eq!(odata.error.code, "-1023");
        assert_eq!(odata.error.message, "Record is missing");
        assert_eq!(
            err.to_string(),
            r#"OData request failed with status 404: {"error":{"code":"-1023","message":"Record is missing"}}"#
        );
    }

    #[test]
    fn test_remote_error_with_plain_body() {
        let err = ClientError::Remote {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert!(err.odata_error().is_none());
        assert!(!err.is_not_found());
    }
}
