//! Declarative provider mapping
//!
//! A provider mapper is plain data: one table of request fields and one of
//! response fields. [`ProviderMapper::map_request`] and
//! [`ProviderMapper::map_response`] evaluate any such table. Provider
//! modules supply the per-field functions.

use crate::protocol::types::{ChatRequest, ChatResponse, FileMetadata};
use crate::providers::error::{GatewayError, GatewayResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// Builds one wire field from the canonical request; `None` omits the field
pub type RequestBuild = fn(&ChatRequest) -> GatewayResult<Option<Value>>;

/// Produces one canonical field from the value at `wire_path` and the whole wire response
pub type ResponseTransform = fn(&Value, &Value) -> GatewayResult<Value>;

/// Row of a request table
#[derive(Debug, Clone, Copy)]
pub struct RequestField {
    pub wire_key: &'static str,
    pub build: RequestBuild,
}

/// Row of a response table
#[derive(Debug, Clone, Copy)]
pub struct ResponseField {
    /// Field of [`ChatResponse`]
    pub canonical: &'static str,
    /// Location in the wire response; empty means the root
    pub wire_path: &'static [&'static str],
    pub transform: ResponseTransform,
}

/// Canonical/wire translation for one provider API surface
#[derive(Debug)]
pub struct ProviderMapper {
    pub name: &'static str,
    /// Path of the completion endpoint, relative to the client base URL
    pub endpoint: &'static str,
    pub request_fields: &'static [RequestField],
    pub response_fields: &'static [ResponseField],
}

impl ProviderMapper {
    /// Canonical request to wire body; fields appear in table order
    pub fn map_request(&self, request: &ChatRequest) -> GatewayResult<Value> {
        let mut body = Map::new();
        for field in self.request_fields {
            if let Some(value) = (field.build)(request)? {
                body.insert(field.wire_key.to_string(), value);
            }
        }
        Ok(Value::Object(body))
    }

    /// Wire response to canonical response
    pub fn map_response(&self, wire: &Value) -> GatewayResult<ChatResponse> {
        let mut canonical = Map::new();
        for field in self.response_fields {
            let at = lookup(wire, field.wire_path).unwrap_or(&Value::Null);
            canonical.insert(field.canonical.to_string(), (field.transform)(at, wire)?);
        }
        serde_json::from_value(Value::Object(canonical)).map_err(|e| {
            GatewayError::InvalidResponse(format!("Unexpected {} response: {}", self.name, e))
        })
    }
}

/// Maps a provider file record to [`FileMetadata`]
pub trait FileOutputMapper: Send + Sync {
    fn map(&self, raw: &Value) -> GatewayResult<FileMetadata>;

    /// Extra multipart fields sent with an upload
    fn upload_fields(&self, purpose: Option<&str>) -> Vec<(String, String)> {
        let _ = purpose;
        Vec::new()
    }
}

/// Follow `path` through nested objects
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

pub fn passthrough(value: &Value, _wire: &Value) -> GatewayResult<Value> {
    Ok(value.clone())
}

/// Strings pass through; anything else becomes `""`
pub fn string_or_empty(value: &Value, _wire: &Value) -> GatewayResult<Value> {
    Ok(Value::String(value.as_str().unwrap_or_default().to_string()))
}

pub fn model(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(Some(Value::String(request.model.clone())))
}

pub fn max_tokens(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(Some(json!(request.max_tokens)))
}

/// Tool input as the JSON string OpenAI-style APIs expect
pub fn stringify_tool_input(input: &Value) -> GatewayResult<String> {
    Ok(serde_json::to_string(input)?)
}

/// Tool arguments back to structured JSON
///
/// Strings are parsed; already-structured values pass through. A blank
/// string means no arguments.
pub fn parse_tool_arguments(arguments: &Value) -> GatewayResult<Value> {
    match arguments {
        Value::String(text) if text.trim().is_empty() => Ok(Value::Object(Map::new())),
        Value::String(text) => serde_json::from_str(text).map_err(|e| {
            GatewayError::InvalidResponse(format!("Tool arguments are not valid JSON: {}", e))
        }),
        Value::Null => Ok(Value::Object(Map::new())),
        other => Ok(other.clone()),
    }
}

/// `data:` URL for content that is already base64
pub fn data_url(media_type: &str, base64_data: &str) -> String {
    format!("data:{};base64,{}", media_type, base64_data)
}

/// `data:` URL for raw content
pub fn encode_data_url(media_type: &str, raw: &str) -> String {
    data_url(media_type, &STANDARD.encode(raw.as_bytes()))
}

/// RFC 3339 UTC timestamp with microseconds, e.g. `2025-08-08T06:03:16.000000Z`
pub fn iso8601_micros(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
