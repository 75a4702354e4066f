//! Type definitions for projects, mocks, responses, and request logs.
//!
//! Records mirror their at-rest form: `headers` and `conditions` on a
//! response are JSON-encoded strings, parsed once at the boundary by
//! [`parse_stored_headers`] and [`parse_stored_conditions`]. Malformed
//! stored data degrades to an empty value, never an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Methods a mock can be registered under.
pub const SUPPORTED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];

/// A project owns mocks and is addressed publicly by its slug.
///
/// Exactly one of `user_id` / `organization_id` is set (owner scoping is
/// mutually exclusive); the execution engine never inspects either.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

/// A user-defined virtual endpoint within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mock {
    pub id: String,
    pub project_id: String,
    /// Path template, normalized to start with `/`. May contain `{name}`
    /// placeholders for variable segments.
    #[serde(deserialize_with = "deserialize_mock_path")]
    pub path: String,
    /// Stored uppercase; matching is performed on the uppercase form.
    #[serde(deserialize_with = "deserialize_method")]
    pub method: String,
    /// Inactive mocks are invisible to execution.
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub response_type: ResponseType,
    /// Simulated latency applied before emitting the selected response.
    #[serde(default)]
    pub response_delay_ms: u64,
}

impl Mock {
    /// Whether the path carries `{name}` placeholder syntax.
    pub fn is_template(&self) -> bool {
        self.path.contains('{') && self.path.contains('}')
    }
}

/// Content-type hint used when a response defines no Content-Type header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Xml,
    Text,
    Html,
    /// Unrecognized hints fall back to JSON.
    #[serde(other)]
    Other,
}

impl ResponseType {
    pub fn content_type(&self) -> &'static str {
        match self {
            ResponseType::Json | ResponseType::Other => "application/json",
            ResponseType::Xml => "application/xml",
            ResponseType::Text => "text/plain",
            ResponseType::Html => "text/html",
        }
    }
}

/// One candidate reply configured for a mock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDef {
    pub id: String,
    pub mock_id: String,
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    /// Header map, JSON-encoded at rest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
    /// Opaque payload, emitted byte-for-byte.
    #[serde(default)]
    pub body: String,
    /// Deterministic fallback when weighted selection degenerates. At most
    /// one response per mock carries this flag; the write side unsets all
    /// others on every set.
    #[serde(default)]
    pub is_default: bool,
    /// Relative selection probability within a pool.
    #[serde(default = "default_weight")]
    pub weight: u64,
    /// Condition list, JSON-encoded at rest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
}

/// A declarative rule gating whether a response is eligible for a request.
///
/// All fields default so that partially-formed stored conditions still
/// deserialize; an unknown type or operator simply never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub kind: ConditionType,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: String,
}

/// Which part of the request a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Header,
    Query,
    Body,
    Path,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    Equals,
    Contains,
    Regex,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Captured inbound request, as seen by the execution engine.
///
/// `path` is the logical mock path with the project slug already stripped;
/// `method` is uppercase.
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<String>,
    pub client_ip: String,
    pub user_agent: Option<String>,
}

/// Append-only record of one execution attempt.
///
/// Mock/project references are nullable so the record survives mock
/// deletion and failed lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLog {
    pub project_id: Option<String>,
    pub mock_id: Option<String>,
    pub method: String,
    pub path: String,
    /// Request headers, serialized as JSON.
    pub headers: String,
    pub body: Option<String>,
    /// Parsed query map, serialized as JSON.
    pub query: String,
    pub response_status: u16,
    pub elapsed_ms: u64,
    pub client_ip: String,
    pub user_agent: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Parse a stored header map, tolerating invalid JSON and non-object
/// values by returning an empty map. Non-string values are stringified.
pub fn parse_stored_headers(raw: Option<&str>) -> HashMap<String, String> {
    let Some(raw) = raw else {
        return HashMap::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return HashMap::new();
    };
    let Some(object) = value.as_object() else {
        return HashMap::new();
    };
    object
        .iter()
        .map(|(k, v)| {
            let v = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect()
}

/// Parse a stored condition list, tolerating invalid JSON and non-array
/// values by returning an empty list ("no conditions").
pub fn parse_stored_conditions(raw: Option<&str>) -> Vec<Condition> {
    raw.and_then(|raw| serde_json::from_str::<Vec<Condition>>(raw).ok())
        .unwrap_or_default()
}

/// Normalize a mock path to start with a leading slash.
pub fn normalize_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_status_code() -> u16 {
    200
}

pub(crate) fn default_weight() -> u64 {
    100
}

fn deserialize_mock_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_path(&raw))
}

fn deserialize_method<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.to_ascii_uppercase())
}

/// Deserialize a status code from either a number or a string.
pub(crate) fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        serde_json::Value::String(s) => s
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("statusCode must be a number or string")),
    }
}
