//! Data model for token endpoint configurations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use uuid::Uuid;

/// One user-supplied `{key, value}` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(alias = "keyName", default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl KeyValue {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// HTTP verb used against the token endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Which body collection is authoritative for a POST.
///
/// `None` is what GET configurations carry; a POST with `None` is sent as a form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyEncoding {
    #[serde(rename = "none")]
    None,
    #[default]
    #[serde(rename = "form", alias = "url-encoded-form", alias = "form_data")]
    UrlEncodedForm,
    #[serde(rename = "data_json", alias = "raw-json", alias = "json")]
    RawJson,
}

/// Request-shaped part of a configuration; what validation operates on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRequestSpec {
    pub url: String,
    pub method: HttpMethod,
    #[serde(alias = "dataType")]
    pub encoding: BodyEncoding,
    pub params: Vec<KeyValue>,
    pub form_data: Vec<KeyValue>,
    pub data_json: String,
    pub headers_data: Vec<KeyValue>,
}

/// Per-project, per-environment token endpoint configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    #[serde(deserialize_with = "identifier")]
    pub project_id: String,
    #[serde(deserialize_with = "identifier")]
    pub env_id: String,
    #[serde(flatten)]
    pub request: TokenRequestSpec,
    pub is_oauth_open: bool,
    /// Refresh period for the job in hours
    pub token_valid_hour: Option<u32>,
}

/// Identifiers arrive as strings or integers; null reads as empty, i.e. missing
fn identifier<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Identifier {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Option::<Identifier>::deserialize(deserializer)? {
        Some(Identifier::Text(text)) => text,
        Some(Identifier::Unsigned(number)) => number.to_string(),
        Some(Identifier::Signed(number)) => number.to_string(),
        None => String::new(),
    })
}

impl OAuthConfig {
    /// Unique key of this configuration
    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(&self.project_id, &self.env_id)
    }
}

/// (project_id, env_id) pair identifying one configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigKey {
    pub project_id: String,
    pub env_id: String,
}

impl ConfigKey {
    pub fn new(project_id: &str, env_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            env_id: env_id.to_string(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.env_id)
    }
}

/// A persisted configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub config: OAuthConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredConfig {
    pub fn new(config: OAuthConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> ConfigKey {
        self.config.key()
    }
}

/// Body of a successful token endpoint response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TokenPayload {
    /// Response declared a JSON content type and parsed as JSON; kept as received
    Json(Box<RawValue>),
    /// Anything else, byte-for-byte as text
    Text(String),
}

impl TokenPayload {
    /// Body exactly as the endpoint sent it
    pub fn as_str(&self) -> &str {
        match self {
            TokenPayload::Json(raw) => raw.get(),
            TokenPayload::Text(text) => text,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, TokenPayload::Json(_))
    }
}

impl PartialEq for TokenPayload {
    fn eq(&self, other: &Self) -> bool {
        self.is_json() == other.is_json() && self.as_str() == other.as_str()
    }
}
