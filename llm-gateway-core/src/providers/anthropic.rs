//! Claude Messages API mapping
//!
//! Covers the API-key surface and the OAuth (Claude Code) variant, which
//! shares everything but the system prompt and model name handling.

use crate::http::error::{ClassifierRule, ErrorRules, MessageMatch};
use crate::protocol::types::{
    ChatRequest, ContentBlock, FileMetadata, Message, Role, SystemPrompt, Tool,
};
use crate::providers::error::{ErrorKind, GatewayError, GatewayResult};
use crate::providers::mapping::{
    iso8601_micros, max_tokens, passthrough, string_or_empty, FileOutputMapper, ProviderMapper,
    RequestField, ResponseField,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// First system block of every Claude Code request
pub const CLAUDE_CODE_IDENTITY: &str = "You are Claude Code, Anthropic's official CLI for Claude.";

/// Model used when a build names none
pub const CLAUDE_DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Model prefix that selects the OAuth variant
pub const CLAUDE_CODE_MODEL_PREFIX: &str = "claude_code/";

const CODE_EXECUTION_TOOL: &str = "code_execution_20250522";

pub static CLAUDE_ERROR_RULES: ErrorRules = ErrorRules {
    code_field: "type",
    rules: &[ClassifierRule {
        status: 400,
        matcher: MessageMatch::Prefix("prompt is too long"),
        kind: ErrorKind::PromptTooLong,
        code_field: None,
    }],
};

const CLAUDE_RESPONSE: &[ResponseField] = &[
    ResponseField { canonical: "id", wire_path: &["id"], transform: string_or_empty },
    ResponseField { canonical: "model", wire_path: &["model"], transform: string_or_empty },
    ResponseField { canonical: "usage", wire_path: &["usage"], transform: passthrough },
    ResponseField { canonical: "choices", wire_path: &[], transform: root_choice },
    ResponseField { canonical: "files", wire_path: &["content"], transform: code_execution_files },
];

pub static CLAUDE: ProviderMapper = ProviderMapper {
    name: "claude",
    endpoint: "messages",
    request_fields: &[
        RequestField { wire_key: "model", build: model },
        RequestField { wire_key: "max_tokens", build: max_tokens },
        RequestField { wire_key: "messages", build: messages },
        RequestField { wire_key: "tools", build: tools },
        RequestField { wire_key: "system", build: system },
    ],
    response_fields: CLAUDE_RESPONSE,
};

pub static CLAUDE_OAUTH: ProviderMapper = ProviderMapper {
    name: "claude_code",
    endpoint: "messages",
    request_fields: &[
        RequestField { wire_key: "model", build: oauth_model },
        RequestField { wire_key: "max_tokens", build: max_tokens },
        RequestField { wire_key: "messages", build: messages },
        RequestField { wire_key: "tools", build: tools },
        RequestField { wire_key: "system", build: oauth_system },
    ],
    response_fields: CLAUDE_RESPONSE,
};

fn model(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(Some(Value::String(request.model.clone())))
}

fn oauth_model(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    let model = request
        .model
        .strip_prefix(CLAUDE_CODE_MODEL_PREFIX)
        .unwrap_or(&request.model);
    Ok(Some(Value::String(model.to_string())))
}

fn messages(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    let messages = request.messages.iter().map(message).collect();
    Ok(Some(Value::Array(messages)))
}

fn message(message: &Message) -> Value {
    // Claude only knows user and assistant turns
    let role = match message.role {
        Role::Assistant => "assistant",
        _ => "user",
    };
    let content: Vec<Value> = message.content.iter().map(block).collect();
    json!({ "role": role, "content": content })
}

/// Canonical block in Claude wire shape
pub fn block(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text, cache_control } => {
            let mut object = Map::new();
            object.insert("type".into(), json!("text"));
            object.insert("text".into(), json!(text));
            if let Some(cache) = cache_control {
                object.insert("cache_control".into(), cache.clone());
            }
            Value::Object(object)
        }
        ContentBlock::Image { data, media_type } => json!({
            "type": "image",
            "source": { "data": data, "type": "base64", "media_type": media_type }
        }),
        ContentBlock::File { data, media_type, .. } => json!({
            "type": "document",
            "source": { "data": data, "type": "text", "media_type": media_type }
        }),
        ContentBlock::ToolUse { id, name, input } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            cache_control,
        } => {
            let mut object = Map::new();
            object.insert("type".into(), json!("tool_result"));
            object.insert("tool_use_id".into(), json!(tool_use_id));
            object.insert("content".into(), content.clone());
            if let Some(cache) = cache_control {
                object.insert("cache_control".into(), cache.clone());
            }
            Value::Object(object)
        }
        ContentBlock::Raw(value) => value.clone(),
    }
}

fn tools(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(request
        .tools()
        .map(|tools| Value::Array(tools.iter().map(tool).collect())))
}

fn tool(tool: &Tool) -> Value {
    match tool {
        Tool::Definition(definition) => {
            let mut object = Map::new();
            object.insert("name".into(), json!(definition.name));
            object.insert("description".into(), json!(definition.description));
            object.insert("input_schema".into(), definition.input_schema.clone());
            if let Some(cache) = &definition.cache_control {
                object.insert("cache_control".into(), cache.clone());
            }
            Value::Object(object)
        }
        Tool::Hosted(_) if tool.hosted_type() == Some("code_execution") => {
            json!({ "name": "code_execution", "type": CODE_EXECUTION_TOOL })
        }
        Tool::Hosted(value) => value.clone(),
    }
}

fn system(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(system_blocks(&request.system))
}

fn oauth_system(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    let mut blocks = Vec::with_capacity(request.system.len() + 1);
    blocks.push(ContentBlock::text(CLAUDE_CODE_IDENTITY));
    blocks.extend(request.system.blocks().iter().cloned());
    Ok(system_blocks(&SystemPrompt(blocks)))
}

/// Empty system is omitted; every block keeps its cache marker
fn system_blocks(system: &SystemPrompt) -> Option<Value> {
    match system.blocks() {
        [] => None,
        blocks => Some(Value::Array(blocks.iter().map(block).collect())),
    }
}

/// Claude returns one turn at the root; wrap it as the only choice
fn root_choice(_: &Value, wire: &Value) -> GatewayResult<Value> {
    let content = match wire.get("content") {
        Some(Value::Array(blocks)) => Value::Array(blocks.clone()),
        _ => Value::Array(Vec::new()),
    };
    Ok(json!([{
        "role": "assistant",
        "finish_reason": wire.get("stop_reason").cloned().unwrap_or(Value::Null),
        "content": content
    }]))
}

/// File ids produced by the code execution tool
fn code_execution_files(content: &Value, _: &Value) -> GatewayResult<Value> {
    let files = content
        .as_array()
        .into_iter()
        .flatten()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("code_execution_tool_result"))
        .filter_map(|block| block.pointer("/content/content").and_then(Value::as_array))
        .flatten()
        .filter_map(|output| output.get("file_id").and_then(Value::as_str))
        .map(|file_id| json!({ "file_id": file_id, "filename": null }))
        .collect();
    Ok(Value::Array(files))
}

/// Files API records
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeFileMapper;

impl FileOutputMapper for ClaudeFileMapper {
    fn map(&self, raw: &Value) -> GatewayResult<FileMetadata> {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::InvalidResponse("File record has no id".into()))?;
        let created_at = raw
            .get("created_at")
            .and_then(Value::as_str)
            .map(|text| match DateTime::parse_from_rfc3339(text) {
                Ok(parsed) => iso8601_micros(parsed.with_timezone(&Utc)),
                Err(_) => text.to_string(),
            })
            .unwrap_or_default();

        Ok(FileMetadata {
            id: id.to_string(),
            size_bytes: raw.get("size_bytes").and_then(Value::as_u64).unwrap_or(0),
            created_at,
            filename: raw
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            mime_type: raw.get("mime_type").and_then(Value::as_str).map(str::to_string),
            downloadable: raw.get("downloadable").and_then(Value::as_bool).unwrap_or(false),
            purpose: "user_data".to_string(),
            expires_at: None,
        })
    }
}
