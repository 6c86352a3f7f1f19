//! OpenAI Files API records

use crate::protocol::types::FileMetadata;
use crate::providers::error::{GatewayError, GatewayResult};
use crate::providers::mapping::{iso8601_micros, FileOutputMapper};
use chrono::{TimeZone, Utc};
use serde_json::Value;

/// Purpose used when the caller does not name one
pub const DEFAULT_PURPOSE: &str = "user_data";

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiFileMapper;

impl FileOutputMapper for OpenAiFileMapper {
    fn map(&self, raw: &Value) -> GatewayResult<FileMetadata> {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::InvalidResponse("File record has no id".into()))?;

        let created_at = match raw.get("created_at").and_then(Value::as_i64) {
            Some(epoch) => Utc
                .timestamp_opt(epoch, 0)
                .single()
                .map(iso8601_micros)
                .ok_or_else(|| {
                    GatewayError::InvalidResponse(format!("Invalid created_at: {}", epoch))
                })?,
            None => String::new(),
        };

        let purpose = raw
            .get("purpose")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PURPOSE)
            .to_string();
        let expires_at = raw
            .get("expires_at")
            .and_then(Value::as_i64)
            .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
            .map(iso8601_micros);

        Ok(FileMetadata {
            id: id.to_string(),
            size_bytes: raw.get("bytes").and_then(Value::as_u64).unwrap_or(0),
            created_at,
            filename: raw
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            mime_type: None,
            // Files uploaded as user data cannot be fetched back
            downloadable: purpose != DEFAULT_PURPOSE,
            purpose,
            expires_at,
        })
    }

    fn upload_fields(&self, purpose: Option<&str>) -> Vec<(String, String)> {
        vec![(
            "purpose".to_string(),
            purpose.unwrap_or(DEFAULT_PURPOSE).to_string(),
        )]
    }
}
