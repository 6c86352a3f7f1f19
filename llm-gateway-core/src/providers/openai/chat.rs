//! Chat Completions mapping
//!
//! The shared core for every OpenAI-compatible chat API. Providers differ
//! only through a [`ChatDialect`] and their request field tables; Groq
//! reuses these functions with its own dialect.

use super::types::WireChoice;
use crate::protocol::types::{ChatRequest, ContentBlock, Message, SystemPrompt, Tool};
use crate::providers::error::GatewayResult;
use crate::providers::mapping::{
    data_url, encode_data_url, model, parse_tool_arguments, passthrough, string_or_empty,
    stringify_tool_input, ProviderMapper, RequestField, ResponseField,
};
use serde_json::{json, Value};

/// Per-provider overrides of the chat core
#[derive(Debug, Clone, Copy)]
pub struct ChatDialect {
    /// Role used for system prompt messages
    pub system_role: &'static str,
}

pub const OPENAI_DIALECT: ChatDialect = ChatDialect {
    system_role: "developer",
};

pub static OPENAI_CHAT: ProviderMapper = ProviderMapper {
    name: "openai_chat",
    endpoint: "chat/completions",
    request_fields: &[
        RequestField { wire_key: "model", build: model },
        RequestField { wire_key: "messages", build: openai_messages },
        RequestField { wire_key: "max_completion_tokens", build: max_completion_tokens },
        RequestField { wire_key: "tools", build: tools },
    ],
    response_fields: CHAT_RESPONSE,
};

/// Response table shared by every chat-completions provider
pub const CHAT_RESPONSE: &[ResponseField] = &[
    ResponseField { canonical: "id", wire_path: &["id"], transform: string_or_empty },
    ResponseField { canonical: "model", wire_path: &["model"], transform: string_or_empty },
    ResponseField { canonical: "usage", wire_path: &["usage"], transform: passthrough },
    ResponseField { canonical: "choices", wire_path: &["choices"], transform: choices },
];

fn openai_messages(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    messages_with(request, &OPENAI_DIALECT, &request.messages)
}

/// `system ++ messages` under `dialect`
pub fn messages_with(
    request: &ChatRequest,
    dialect: &ChatDialect,
    messages: &[Message],
) -> GatewayResult<Option<Value>> {
    let mut wire = system_messages(&request.system, dialect.system_role);
    for message in messages {
        wire.extend(map_message(message)?);
    }
    Ok(Some(Value::Array(wire)))
}

pub fn max_completion_tokens(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(Some(json!(request.max_tokens)))
}

/// One message per system block; empty system yields none
pub fn system_messages(system: &SystemPrompt, role: &str) -> Vec<Value> {
    system
        .blocks()
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text, .. } => json!({ "role": role, "content": text }),
            other => json!({ "role": role, "content": [content_part(other)] }),
        })
        .collect()
}

/// Map one canonical message to one or more wire messages
///
/// Without tool activity the message stays whole, its blocks becoming content
/// parts in order. With tool activity it is split into: joined text, one
/// assistant `tool_calls` message, one `tool` message per result, then each
/// remaining part as its own message.
pub fn map_message(message: &Message) -> GatewayResult<Vec<Value>> {
    let role = message.role.as_str();
    let has_tools = message.content.iter().any(|block| {
        matches!(block, ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. })
    });

    if !has_tools {
        let parts: Vec<Value> = message.content.iter().map(content_part).collect();
        return Ok(vec![json!({ "role": role, "content": parts })]);
    }

    let mut wire = Vec::new();

    let text: Vec<&str> = message.content.iter().filter_map(ContentBlock::as_text).collect();
    if !text.is_empty() {
        wire.push(json!({ "role": role, "content": text.concat() }));
    }

    let mut tool_calls = Vec::new();
    for block in &message.content {
        if let ContentBlock::ToolUse { id, name, input } = block {
            tool_calls.push(json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": stringify_tool_input(input)? }
            }));
        }
    }
    if !tool_calls.is_empty() {
        wire.push(json!({ "role": "assistant", "content": null, "tool_calls": tool_calls }));
    }

    for block in &message.content {
        if let ContentBlock::ToolResult { tool_use_id, content, .. } = block {
            wire.push(json!({ "role": "tool", "tool_call_id": tool_use_id, "content": content }));
        }
    }

    for block in &message.content {
        if !matches!(
            block,
            ContentBlock::Text { .. } | ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. }
        ) {
            wire.push(json!({ "role": role, "content": [content_part(block)] }));
        }
    }

    Ok(wire)
}

/// Content part for a non-tool block
pub fn content_part(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text, .. } => json!({ "type": "text", "text": text }),
        ContentBlock::Image { data, media_type } => json!({
            "type": "image_url",
            "image_url": { "url": data_url(media_type, data) }
        }),
        ContentBlock::File { data, media_type, name, .. } => {
            // OpenAI only accepts PDF file parts
            let media_type = if media_type == "text/plain" { "application/pdf" } else { media_type };
            json!({
                "type": "file",
                "file": { "filename": name, "file_data": encode_data_url(media_type, data) }
            })
        }
        ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. } => Value::from(block.clone()),
        ContentBlock::Raw(value) => value.clone(),
    }
}

pub fn tools(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(request.tools().map(|tools| {
        Value::Array(
            tools
                .iter()
                .map(|tool| match tool {
                    Tool::Definition(definition) => json!({
                        "type": "function",
                        "function": {
                            "name": definition.name,
                            "description": definition.description,
                            "parameters": definition.input_schema
                        }
                    }),
                    Tool::Hosted(value) => value.clone(),
                })
                .collect(),
        )
    }))
}

/// `choices` to canonical choices
///
/// Text is kept only when non-blank; each tool call becomes a `tool_use`
/// block with parsed arguments.
pub fn choices(value: &Value, _wire: &Value) -> GatewayResult<Value> {
    let wire_choices: Vec<WireChoice> = match value {
        Value::Null => Vec::new(),
        other => serde_json::from_value(other.clone())?,
    };

    let mut mapped = Vec::with_capacity(wire_choices.len());
    for choice in wire_choices {
        let message = choice.message;
        let mut content = Vec::new();
        match message.content {
            Some(Value::String(text)) if !text.trim().is_empty() => {
                content.push(json!({ "type": "text", "text": text }));
            }
            Some(Value::Array(parts)) => content.extend(parts),
            _ => {}
        }
        for call in message.tool_calls {
            content.push(json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.function.name,
                "input": parse_tool_arguments(&call.function.arguments)?
            }));
        }
        mapped.push(json!({
            "role": message.role.unwrap_or_else(|| "assistant".to_string()),
            "finish_reason": choice.finish_reason,
            "content": content
        }));
    }
    Ok(Value::Array(mapped))
}
