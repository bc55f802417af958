use fmodata_core::models::{ScriptRequest, ScriptResponse};
use reqwest::{Method, StatusCode};

use crate::client::{decode, encode, expect_status, Client};
use crate::{Result, ScriptResult};

impl Client {
    /// Run the script `name`, optionally passing a parameter.
    ///
    /// The result code is returned as-is; interpreting it is up to the caller.
    pub async fn run_script(
        &self,
        name: &str,
        parameter: Option<&serde_json::Value>,
    ) -> Result<ScriptResult> {
        let url = self.url([format!("Script.{}", name)]);
        let body = match parameter {
            Some(value) => Some(encode(&ScriptRequest {
                script_parameter_value: value,
            })?),
            None => None,
        };

        tracing::debug!(script = %name, has_parameter = parameter.is_some(), "Running script");
        let response = self.send(Method::POST, &url, body).await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        let envelope: ScriptResponse = decode(response).await?;
        Ok(envelope.script_result)
    }
}
