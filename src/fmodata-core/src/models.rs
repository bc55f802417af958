use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Record is an open mapping from field name to a JSON value.
///
/// The remote schema is not known to the client, so records are
/// round-tripped as-is.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Path segment of the OData API under the host
pub const ODATA_API_ROOT: &str = "fmi/odata/v4";

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// ClientConfig holds everything needed to reach one hosted database
#[derive(Clone)]
pub struct ClientConfig {
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Bounds the whole request. `Duration::ZERO` disables the timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
            timeout: default_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `<host>/fmi/odata/v4/<database>`
    pub fn base_url(&self) -> String {
        format!("{}/{}/{}", self.host, ODATA_API_ROOT, self.database)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// FieldType is the SQL type tag understood by the remote schema engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Numeric,
    Int,
    Varchar,
    CharacterVarying,
    Date,
    Time,
    Timestamp,
    Blob,
    Varbinary,
    LongVarbinary,
    /// Any tag not listed above, passed through verbatim
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Numeric => "NUMERIC",
            FieldType::Int => "INT",
            FieldType::Varchar => "VARCHAR",
            FieldType::CharacterVarying => "CHARACTER VARYING",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Blob => "BLOB",
            FieldType::Varbinary => "VARBINARY",
            FieldType::LongVarbinary => "LONGVARBINARY",
            FieldType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "NUMERIC" => FieldType::Numeric,
            "INT" => FieldType::Int,
            "VARCHAR" => FieldType::Varchar,
            "CHARACTER VARYING" => FieldType::CharacterVarying,
            "DATE" => FieldType::Date,
            "TIME" => FieldType::Time,
            "TIMESTAMP" => FieldType::Timestamp,
            "BLOB" => FieldType::Blob,
            "VARBINARY" => FieldType::Varbinary,
            "LONGVARBINARY" => FieldType::LongVarbinary,
            _ => FieldType::Other(s.to_string()),
        })
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(FieldType::from_str(&tag).unwrap_or_else(|never| match never {}))
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// FieldDefinition describes one column of a table creation request.
///
/// `primary`, `unique` and `global` are passed to the remote engine as-is;
/// nothing is validated locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub global: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary: false,
            unique: false,
            global: false,
            default: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// TableDefinition is the body of a table creation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDefinition {
    #[serde(rename = "tableName")]
    pub table_name: String,
    pub fields: Vec<FieldDefinition>,
}

impl TableDefinition {
    pub fn new(table_name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            table_name: table_name.into(),
            fields,
        }
    }
}

/// Body of an index creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    #[serde(rename = "indexName")]
    pub index_name: String,
}

/// ODataResponse is the envelope around a collection read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ODataResponse {
    #[serde(rename = "@odata.context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(rename = "@odata.count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default)]
    pub value: Vec<Record>,
}

/// ODataError is the error envelope the remote service usually returns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ODataError {
    pub error: ODataErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ODataErrorDetail {
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

/// ScriptResult is the structured outcome of a remote script.
///
/// `code == 0` conventionally means success; the client does not interpret it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptResult {
    pub code: i64,
    #[serde(rename = "resultParameter", default)]
    pub result_parameter: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptResponse {
    #[serde(rename = "scriptResult")]
    pub script_result: ScriptResult,
}

/// Body of a script invocation that carries a parameter
#[derive(Debug, Serialize)]
pub struct ScriptRequest<'a> {
    #[serde(rename = "scriptParameterValue")]
    pub script_parameter_value: &'a serde_json::Value,
}

/// RawJson holds a request or response body as captured on the wire.
///
/// Serializes as embedded JSON when the text parses, as a JSON string when it
/// does not, and as `null` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawJson(pub String);

impl RawJson {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RawJson {
    fn from(value: String) -> Self {
        RawJson(value)
    }
}

impl From<&str> for RawJson {
    fn from(value: &str) -> Self {
        RawJson(value.to_string())
    }
}

impl Serialize for RawJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            return serializer.serialize_none();
        }
        match serde_json::from_str::<serde_json::Value>(&self.0) {
            Ok(value) => value.serialize(serializer),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => RawJson::default(),
            serde_json::Value::String(s) => RawJson(s),
            other => RawJson(other.to_string()),
        })
    }
}

/// UsageLog is one logged request as stored in the request-log table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: i64,
    pub status: i32,
    pub method: String,
    pub error: String,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
    pub response: RawJson,
    pub request: RawJson,
}

/// NewUsageLog is a request log entry before it is assigned an id
#[derive(Debug, Clone)]
pub struct NewUsageLog {
    pub status: i32,
    pub method: String,
    pub error: String,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
    pub response: RawJson,
    pub request: RawJson,
}

/// ErrorResponse represents an API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
