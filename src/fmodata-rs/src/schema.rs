use fmodata_core::models::IndexDefinition;
use reqwest::Method;

use crate::client::{expect_success, Client};
use crate::{Result, TableDefinition};

const TABLES: &str = "FileMaker_Tables";
const INDEXES: &str = "FileMaker_Indexes";

impl Client {
    /// Create a table. Field types and names are validated by the service only.
    pub async fn create_table(&self, table: &TableDefinition) -> Result<()> {
        tracing::info!(table = %table.table_name, fields = table.fields.len(), "Creating table");
        let response = self.send_json(Method::POST, &self.url([TABLES]), table).await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Delete a table by name.
    ///
    /// A missing table is reported however the service reports it; callers
    /// wanting "ensure absent" can ignore the error.
    pub async fn delete_table(&self, table_name: &str) -> Result<()> {
        tracing::info!(table = %table_name, "Deleting table");
        let url = self.url([TABLES, table_name]);
        let response = self.send(Method::DELETE, &url, None).await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Create an index on `field_name`
    pub async fn create_index(&self, table_name: &str, field_name: &str) -> Result<()> {
        tracing::info!(table = %table_name, field = %field_name, "Creating index");
        let url = self.url([INDEXES, table_name]);
        let payload = IndexDefinition {
            index_name: field_name.to_string(),
        };
        let response = self.send_json(Method::POST, &url, &payload).await?;
        expect_success(response).await?;
        Ok(())
    }

    pub async fn delete_index(&self, table_name: &str, index_name: &str) -> Result<()> {
        tracing::info!(table = %table_name, index = %index_name, "Deleting index");
        let url = self.url([INDEXES, table_name, index_name]);
        let response = self.send(Method::DELETE, &url, None).await?;
        expect_success(response).await?;
        Ok(())
    }
}
