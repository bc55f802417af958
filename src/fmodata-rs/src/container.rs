use base64::prelude::*;
use reqwest::{Method, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::client::{entity_segment, expect_status, Client};
use crate::{Record, Result};

impl Client {
    /// Store `content` in a container field.
    ///
    /// The service has no binary upload: the bytes travel base64-encoded as
    /// an ordinary field update.
    pub async fn upload_container(
        &self,
        table: &str,
        id: &str,
        field: &str,
        content: &[u8],
    ) -> Result<()> {
        let mut payload = Record::new();
        payload.insert(
            field.to_string(),
            serde_json::Value::String(BASE64_STANDARD.encode(content)),
        );

        tracing::debug!(table = %table, id = %id, field = %field, bytes = content.len(), "Uploading container");
        let url = self.entity_url(table, id);
        let response = self.send_json(Method::PATCH, &url, &payload).await?;
        expect_status(response, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    /// Read `reader` to the end and upload it like [`Client::upload_container`]
    pub async fn upload_container_from<R>(
        &self,
        table: &str,
        id: &str,
        field: &str,
        mut reader: R,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await?;
        self.upload_container(table, id, field, &content).await
    }

    /// Fetch the raw bytes of a container field.
    ///
    /// Unlike upload, the service streams the content as-is; nothing is
    /// base64-decoded here.
    pub async fn download_container(&self, table: &str, id: &str, field: &str) -> Result<Vec<u8>> {
        let url = self.url([entity_segment(table, id).as_str(), field, "$value"]);
        let response = self.send(Method::GET, &url, None).await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        let bytes = response.bytes().await?;
        tracing::debug!(table = %table, id = %id, field = %field, bytes = bytes.len(), "Downloaded container");
        Ok(bytes.to_vec())
    }
}
