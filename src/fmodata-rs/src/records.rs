use reqwest::{Method, StatusCode};

use crate::client::{decode, encode_query, expect_status, Client};
use crate::{ClientError, ODataResponse, Record, Result};

impl Client {
    /// List records of `table`.
    ///
    /// `query` is passed through verbatim apart from encoding, e.g.
    /// `&[("$filter", "Name eq 'Smith'"), ("$top", "10")]`.
    pub async fn list<K, V>(&self, table: &str, query: &[(K, V)]) -> Result<Vec<Record>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.url([table]);
        let query = encode_query(query);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let response = self.send(Method::GET, &url, None).await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        let envelope: ODataResponse = decode(response).await?;
        tracing::debug!(table = %table, count = envelope.value.len(), "Listed records");
        Ok(envelope.value)
    }

    /// List every record of `table` without query options
    pub async fn list_all(&self, table: &str) -> Result<Vec<Record>> {
        self.list::<&str, &str>(table, &[]).await
    }

    /// Fetch one record. A missing record surfaces as a 404 remote error.
    pub async fn get(&self, table: &str, id: &str) -> Result<Record> {
        let url = self.entity_url(table, id);
        let response = self.send(Method::GET, &url, None).await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        decode(response).await
    }

    /// Create a record.
    ///
    /// Returns the created record when the service sends one back and `None`
    /// when it answers with an empty body.
    pub async fn create(&self, table: &str, data: &Record) -> Result<Option<Record>> {
        let url = self.url([table]);
        let response = self.send_json(Method::POST, &url, data).await?;
        let response = expect_status(response, &[StatusCode::OK, StatusCode::CREATED]).await?;

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(ClientError::Decode)
    }

    /// Partial update: only the fields present in `data` change
    pub async fn update(&self, table: &str, id: &str, data: &Record) -> Result<()> {
        let url = self.entity_url(table, id);
        let response = self.send_json(Method::PATCH, &url, data).await?;
        expect_status(response, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let url = self.entity_url(table, id);
        let response = self.send(Method::DELETE, &url, None).await?;
        expect_status(response, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }
}
