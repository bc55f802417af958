//! Copy the local request log into a table on the FileMaker server.

use chrono::SecondsFormat;
use serde_json::Value;

use fmodata_core::models::{
    FieldDefinition, FieldType, RawJson, Record, TableDefinition, UsageLog,
};
use fmodata_rs::Client;

/// Default name of the remote table
pub const DEFAULT_TABLE: &str = "Logs";

/// Remote layout of a request log table
pub fn logs_table(name: &str) -> TableDefinition {
    TableDefinition::new(
        name,
        vec![
            FieldDefinition::new("ID", FieldType::Numeric).primary().unique(),
            FieldDefinition::new("Status", FieldType::Numeric),
            FieldDefinition::new("Method", FieldType::Varchar),
            FieldDefinition::new("Error", FieldType::Varchar),
            FieldDefinition::new("Endpoint", FieldType::Varchar),
            FieldDefinition::new("CreatedAt", FieldType::Timestamp),
            FieldDefinition::new("Response", FieldType::Varchar),
            FieldDefinition::new("Request", FieldType::Varchar),
        ],
    )
}

/// One remote record per log entry; bodies are stored as JSON text
pub fn log_record(log: &UsageLog) -> Record {
    let json_text =
        |raw: &RawJson| serde_json::to_string(raw).unwrap_or_else(|_| "null".to_string());

    let mut record = Record::new();
    record.insert("ID".into(), Value::from(log.id));
    record.insert("Status".into(), Value::from(log.status));
    record.insert("Method".into(), Value::from(log.method.clone()));
    record.insert("Error".into(), Value::from(log.error.clone()));
    record.insert("Endpoint".into(), Value::from(log.endpoint.clone()));
    record.insert(
        "CreatedAt".into(),
        Value::from(log.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    record.insert("Response".into(), Value::from(json_text(&log.response)));
    record.insert("Request".into(), Value::from(json_text(&log.request)));
    record
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// Drop and recreate `table`, then upload `logs` one record at a time.
///
/// Failing to create the table aborts; failing records are counted and skipped.
pub async fn migrate(
    client: &Client,
    table: &str,
    logs: &[UsageLog],
) -> fmodata_rs::Result<MigrationReport> {
    if let Err(e) = client.delete_table(table).await {
        tracing::debug!(table = %table, "Table not dropped: {}", e);
    }
    client.create_table(&logs_table(table)).await?;
    tracing::info!(table = %table, "Table created");

    let mut report = MigrationReport::default();
    for log in logs {
        match client.create(table, &log_record(log)).await {
            Ok(_) => {
                tracing::debug!(id = log.id, "Uploaded log");
                report.uploaded += 1;
            }
            Err(e) => {
                tracing::warn!(id = log.id, "Failed to upload log: {}", e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
