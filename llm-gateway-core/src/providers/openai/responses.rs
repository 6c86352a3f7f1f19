//! Responses API mapping
//!
//! Request items reuse the chat core's system handling and data URLs.
//! Output items carry no usable role discriminant for reasoning and function
//! call entries, so they are classified by their id prefix (`rs_`, `fc_`,
//! `msg_`). That prefix scheme is an observed upstream convention rather
//! than a documented contract; items whose id matches no known prefix fall
//! back to their `type` field.

use super::chat::{max_completion_tokens, system_messages, OPENAI_DIALECT};
use super::types::{WireFunctionCallItem, WireMessageItem};
use crate::protocol::types::{ChatRequest, ContentBlock, Message, Role, Tool};
use crate::providers::error::GatewayResult;
use crate::providers::mapping::{
    data_url, encode_data_url, model, parse_tool_arguments, passthrough, string_or_empty,
    stringify_tool_input, ProviderMapper, RequestField, ResponseField,
};
use serde_json::{json, Value};

pub static OPENAI_RESPONSES: ProviderMapper = ProviderMapper {
    name: "openai_responses",
    endpoint: "responses",
    request_fields: &[
        RequestField { wire_key: "model", build: model },
        RequestField { wire_key: "input", build: input },
        RequestField { wire_key: "tools", build: tools },
        RequestField { wire_key: "max_output_tokens", build: max_completion_tokens },
    ],
    response_fields: &[
        ResponseField { canonical: "id", wire_path: &["id"], transform: string_or_empty },
        ResponseField { canonical: "model", wire_path: &["model"], transform: string_or_empty },
        ResponseField { canonical: "usage", wire_path: &["usage"], transform: passthrough },
        ResponseField { canonical: "choices", wire_path: &["output"], transform: output_choices },
        ResponseField { canonical: "files", wire_path: &["output"], transform: citation_files },
    ],
};

/// Output item kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputItemKind {
    Reasoning,
    FunctionCall,
    Message,
    Other,
}

/// Id prefix table for output items
pub const ITEM_ID_PREFIXES: &[(&str, OutputItemKind)] = &[
    ("rs_", OutputItemKind::Reasoning),
    ("fc_", OutputItemKind::FunctionCall),
    ("msg_", OutputItemKind::Message),
];

/// Classify one output item
pub fn classify_item(item: &Value) -> OutputItemKind {
    let by_prefix = item.get("id").and_then(Value::as_str).and_then(|id| {
        ITEM_ID_PREFIXES
            .iter()
            .find(|(prefix, _)| id.starts_with(prefix))
            .map(|(_, kind)| *kind)
    });
    by_prefix.unwrap_or_else(|| match item.get("type").and_then(Value::as_str) {
        Some("reasoning") => OutputItemKind::Reasoning,
        Some("function_call") => OutputItemKind::FunctionCall,
        Some("message") => OutputItemKind::Message,
        _ => OutputItemKind::Other,
    })
}

fn input(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    let mut items = system_messages(&request.system, OPENAI_DIALECT.system_role);
    for message in &request.messages {
        items.extend(message_items(message)?);
    }
    Ok(Some(Value::Array(items)))
}

/// Input items for one message
///
/// A message with an `id` was produced by this API and is referenced by id.
/// Tool blocks become standalone items; the other blocks are grouped into
/// role messages between them, keeping their order.
fn message_items(message: &Message) -> GatewayResult<Vec<Value>> {
    if let Some(id) = &message.id {
        return Ok(vec![json!({ "id": id })]);
    }

    let role = message.role.as_str();
    let text_type = if message.role == Role::Assistant { "output_text" } else { "input_text" };
    let mut items = Vec::new();
    let mut pending: Vec<Value> = Vec::new();

    for block in &message.content {
        match block {
            ContentBlock::ToolUse { id, name, input } => {
                flush(&mut items, &mut pending, role);
                items.push(json!({
                    "type": "function_call",
                    "call_id": id,
                    "name": name,
                    "arguments": stringify_tool_input(input)?
                }));
            }
            ContentBlock::ToolResult { tool_use_id, content, .. } => {
                flush(&mut items, &mut pending, role);
                let output = match content {
                    Value::String(text) => text.clone(),
                    other => stringify_tool_input(other)?,
                };
                items.push(json!({
                    "type": "function_call_output",
                    "call_id": tool_use_id,
                    "output": output
                }));
            }
            other => pending.push(input_part(other, text_type)),
        }
    }
    flush(&mut items, &mut pending, role);

    if items.is_empty() {
        items.push(json!({ "role": role, "content": [] }));
    }
    Ok(items)
}

fn flush(items: &mut Vec<Value>, pending: &mut Vec<Value>, role: &str) {
    if !pending.is_empty() {
        items.push(json!({ "role": role, "content": std::mem::take(pending) }));
    }
}

fn input_part(block: &ContentBlock, text_type: &str) -> Value {
    match block {
        ContentBlock::Text { text, .. } => json!({ "type": text_type, "text": text }),
        ContentBlock::Image { data, media_type } => json!({
            "type": "input_image",
            "image_url": data_url(media_type, data)
        }),
        ContentBlock::File { data, media_type, name, .. } => {
            let media_type = if media_type == "text/plain" { "application/pdf" } else { media_type };
            json!({
                "type": "input_file",
                "filename": name,
                "file_data": encode_data_url(media_type, data)
            })
        }
        other => Value::from(other.clone()),
    }
}

fn tools(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(request.tools().map(|tools| {
        Value::Array(
            tools
                .iter()
                .map(|tool| match tool {
                    Tool::Definition(definition) => json!({
                        "type": "function",
                        "name": definition.name,
                        "description": definition.description,
                        "parameters": definition.input_schema
                    }),
                    Tool::Hosted(_) if tool.hosted_type() == Some("code_execution") => json!({
                        "type": "code_interpreter",
                        "container": { "type": "auto" }
                    }),
                    Tool::Hosted(value) => value.clone(),
                })
                .collect(),
        )
    }))
}

/// One choice per output item
fn output_choices(output: &Value, _wire: &Value) -> GatewayResult<Value> {
    let items = match output {
        Value::Array(items) => items,
        _ => return Ok(Value::Array(Vec::new())),
    };

    let mut choices = Vec::with_capacity(items.len());
    for item in items {
        let choice = match classify_item(item) {
            OutputItemKind::FunctionCall => {
                let call: WireFunctionCallItem = serde_json::from_value(item.clone())?;
                json!({
                    "id": call.id,
                    "role": call.role.unwrap_or_else(|| "assistant".to_string()),
                    "content": [{
                        "type": "tool_use",
                        "id": call.call_id,
                        "name": call.name,
                        "input": parse_tool_arguments(&call.arguments)?
                    }]
                })
            }
            OutputItemKind::Message => {
                let message: WireMessageItem = serde_json::from_value(item.clone())?;
                let content: Vec<Value> = message.content.into_iter().map(output_part).collect();
                json!({ "id": message.id, "role": message.role, "content": content })
            }
            OutputItemKind::Reasoning => json!({
                "id": item.get("id"),
                "role": null,
                "content": [without_id(item)]
            }),
            OutputItemKind::Other => json!({
                "id": item.get("id"),
                "role": item.get("role"),
                "content": [without_id(item)]
            }),
        };
        choices.push(choice);
    }
    Ok(Value::Array(choices))
}

fn output_part(part: Value) -> Value {
    match part.get("type").and_then(Value::as_str) {
        Some("output_text") => json!({
            "type": "text",
            "text": part.get("text").and_then(Value::as_str).unwrap_or_default()
        }),
        _ => part,
    }
}

fn without_id(item: &Value) -> Value {
    let mut item = item.clone();
    if let Some(object) = item.as_object_mut() {
        object.remove("id");
    }
    item
}

/// Files cited through `container_file_citation` annotations
fn citation_files(output: &Value, _wire: &Value) -> GatewayResult<Value> {
    let files = output
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|part| part.get("annotations").and_then(Value::as_array))
        .flatten()
        .filter(|annotation| {
            annotation.get("type").and_then(Value::as_str) == Some("container_file_citation")
        })
        .map(|annotation| {
            json!({
                "file_id": annotation.get("file_id"),
                "filename": annotation.get("filename"),
                "container_id": annotation.get("container_id")
            })
        })
        .collect();
    Ok(Value::Array(files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::Choice;

    #[test]
    fn test_classify_by_prefix_then_type() {
        assert_eq!(classify_item(&json!({"id": "rs_1", "type": "reasoning"})), OutputItemKind::Reasoning);
        assert_eq!(classify_item(&json!({"id": "fc_1"})), OutputItemKind::FunctionCall);
        assert_eq!(classify_item(&json!({"id": "msg_1"})), OutputItemKind::Message);
        assert_eq!(classify_item(&json!({"id": "item_9", "type": "message"})), OutputItemKind::Message);
        assert_eq!(classify_item(&json!({"id": "ci_1", "type": "code_interpreter_call"})), OutputItemKind::Other);
    }

    #[test]
    fn test_request_items() {
        let request = ChatRequest::new(
            "gpt-5",
            vec![
                Message::user("What is the weather?"),
                Message::assistant(vec![ContentBlock::tool_use("call_1", "get_weather", json!({"location": "Singapore"}))]),
                Message::new(Role::User, vec![ContentBlock::tool_result("call_1", "31C")]),
            ],
        )
        .with_system("Be brief");

        let body = OPENAI_RESPONSES.map_request(&request).unwrap();
        assert_eq!(
            body["input"],
            json!([
                {"role": "developer", "content": "Be brief"},
                {"role": "user", "content": [{"type": "input_text", "text": "What is the weather?"}]},
                {"type": "function_call", "call_id": "call_1", "name": "get_weather", "arguments": "{\"location\":\"Singapore\"}"},
                {"type": "function_call_output", "call_id": "call_1", "output": "31C"}
            ])
        );
        assert_eq!(body["max_output_tokens"], 4096);
    }

    #[test]
    fn test_messages_with_id_are_referenced() {
        let mut replay = Message::assistant(vec![ContentBlock::text("earlier")]);
        replay.id = Some("msg_abc".to_string());
        let body = OPENAI_RESPONSES
            .map_request(&ChatRequest::new("gpt-5", vec![replay]))
            .unwrap();
        assert_eq!(body["input"], json!([{"id": "msg_abc"}]));
    }

    #[test]
    fn test_tools() {
        let request = ChatRequest::new("gpt-5", vec![Message::user("hi")]).with_tools(vec![
            Tool::function("get_weather", "Weather", json!({"type": "object"})),
            Tool::Hosted(json!({"type": "code_execution"})),
        ]);
        let body = OPENAI_RESPONSES.map_request(&request).unwrap();
        assert_eq!(
            body["tools"],
            json!([
                {"type": "function", "name": "get_weather", "description": "Weather", "parameters": {"type": "object"}},
                {"type": "code_interpreter", "container": {"type": "auto"}}
            ])
        );
    }

    #[test]
    fn test_output_items_become_choices() {
        let wire = json!({
            "id": "resp_1",
            "model": "gpt-5",
            "usage": {"input_tokens": 3},
            "output": [
                {"id": "rs_1", "type": "reasoning", "summary": []},
                {"id": "fc_1", "type": "function_call", "call_id": "call_1", "name": "get_weather",
                 "arguments": "{\"location\":\"Singapore\"}", "status": "completed"},
                {"id": "msg_1", "type": "message", "role": "assistant", "status": "completed", "content": [
                    {"type": "output_text", "text": "Here you go.", "annotations": [
                        {"type": "container_file_citation", "file_id": "cfile_1", "filename": "plot.png", "container_id": "cntr_1"}
                    ]}
                ]}
            ]
        });
        let response = OPENAI_RESPONSES.map_response(&wire).unwrap();
        assert_eq!(response.choices.len(), 3);

        let reasoning = &response.choices[0];
        assert_eq!(reasoning.id.as_deref(), Some("rs_1"));
        assert_eq!(reasoning.role, None);
        assert_eq!(reasoning.content, vec![ContentBlock::Raw(json!({"type": "reasoning", "summary": []}))]);

        let call = &response.choices[1];
        assert_eq!(call.role, Some(Role::Assistant));
        assert_eq!(
            call.content,
            vec![ContentBlock::tool_use("call_1", "get_weather", json!({"location": "Singapore"}))]
        );

        let message = &response.choices[2];
        assert_eq!(message.content, vec![ContentBlock::text("Here you go.")]);

        assert_eq!(response.files().len(), 1);
        assert_eq!(response.files()[0].file_id, "cfile_1");
        assert_eq!(response.files()[0].container_id.as_deref(), Some("cntr_1"));
    }

    #[test]
    fn test_choices_replay_by_id() {
        let choice = Choice {
            id: Some("rs_1".into()),
            role: None,
            finish_reason: None,
            content: vec![ContentBlock::Raw(json!({"type": "reasoning", "summary": []}))],
        };
        let body = OPENAI_RESPONSES
            .map_request(&ChatRequest::new("gpt-5", vec![choice.to_message()]))
            .unwrap();
        assert_eq!(body["input"], json!([{"id": "rs_1"}]));
    }
}
