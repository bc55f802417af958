use base64::prelude::*;
use reqwest::{header, Client as HttpClient, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{ClientConfig, ClientError, Result};

/// FileMaker OData API client.
///
/// Holds only immutable configuration and the HTTP transport, so one
/// instance can be cloned and shared across tasks freely.
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    config: ClientConfig,
    base_url: String,
    base: Url,
    auth_header: String,
}

/// `Basic <base64(username:password)>`
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!("Basic {}", BASE64_STANDARD.encode(credentials))
}

/// `<table>('<id>')` with quotes in the key doubled, as OData string
/// literals require
pub fn entity_segment(table: &str, id: &str) -> String {
    format!("{}('{}')", table, id.replace('\'', "''"))
}

/// Form-encode query pairs, with spaces as `%20` rather than `+`.
///
/// The service rejects `+` inside filter expressions. A literal `+` in a
/// value is already escaped as `%2B`, so every remaining `+` is a space.
pub fn encode_query<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish()
        .replace('+', "%20")
}

impl Client {
    /// Create a client for the database described by `config`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }
        let http = builder.build()?;

        let base_url = config.base_url();
        let base = Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url));
        }
        let auth_header = basic_auth_header(&config.username, &config.password);
        tracing::debug!(base_url = %base_url, "OData client created");

        Ok(Self {
            http,
            config,
            base_url,
            base,
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check that the service root is reachable with these credentials.
    ///
    /// Only a 200 counts as success.
    pub async fn ping(&self) -> Result<()> {
        let response = self.send(Method::GET, &self.base_url, None).await?;
        expect_status(response, &[StatusCode::OK]).await?;
        Ok(())
    }

    /// Base URL extended by `segments`, each one percent-encoded so `/`,
    /// `?`, `#` and `%` stay inside their segment
    pub(crate) fn url<I>(&self, segments: I) -> String
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base.clone();
        // Never fails: `new` rejects cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    pub(crate) fn entity_url(&self, table: &str, id: &str) -> String {
        self.url([entity_segment(table, id)])
    }

    /// Execute one request with auth and JSON headers attached.
    ///
    /// Statuses >= 400 are classified here; callers narrow the accepted
    /// success statuses further with [`expect_status`].
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        tracing::debug!(method = %method, url = %url, "OData request");

        let mut request = self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, &self.auth_header)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        if response.status().as_u16() >= 400 {
            return Err(classify(response).await);
        }
        Ok(response)
    }

    /// Serialize `payload` and send it
    pub(crate) async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        payload: &T,
    ) -> Result<Response> {
        let body = encode(payload)?;
        self.send(method, url, Some(body)).await
    }
}

pub(crate) fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(ClientError::Serialization)
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Decode)
}

/// Turn a failed response into a remote error carrying the raw body
pub(crate) async fn classify(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!(status, "Failed to read error body: {}", e);
            String::new()
        }
    };
    tracing::warn!(status, body = %body, "OData request failed");
    ClientError::Remote { status, body }
}

pub(crate) async fn expect_status(response: Response, accepted: &[StatusCode]) -> Result<Response> {
    if accepted.contains(&response.status()) {
        Ok(response)
    } else {
        Err(classify(response).await)
    }
}

pub(crate) async fn expect_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(classify(response).await)
    }
}
