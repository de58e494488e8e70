//! JSON bodies exchanged between the client and the service.
//!
//! Field names follow the wire format (`secondFactor`, `expiryDate`).
//! Response fields are optional so the client can report a body that lacks
//! them instead of failing to deserialize.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `GET /` response: the session-bound secret, base64.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionKeyResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// `POST /` request body.
///
/// `ttl` stays an untyped JSON value: anything that is not a positive
/// integer in range falls back to the default TTL instead of being rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<serde_json::Value>,
    #[serde(
        default,
        rename = "secondFactor",
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub second_factor: Option<String>,
}

/// Accept any JSON scalar as text. `null`, `false`, `0` and `""` mean absent.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::Bool(true) => Some("true".into()),
        serde_json::Value::Number(n) if n.as_f64() == Some(0.0) => None,
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            return Err(D::Error::custom("secondFactor must be a string or number"))
        }
    })
}

/// `POST /` response (201).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSecretResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(
        default,
        rename = "expiryDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_date: Option<String>,
}

/// `GET /<uuid>` response (200).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrieveSecretResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(
        default,
        rename = "expiryDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_date: Option<String>,
}

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format an instant as an IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an IMF-fixdate (falling back to RFC 2822 and RFC 3339).
pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, HTTP_DATE_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
