//! Groq (OpenAI-compatible) mapping
//!
//! The chat core with three overrides: the system role keeps its name, the
//! body carries `temperature` and `response_format`, and file blocks degrade
//! to text because the API has no file parts.

use crate::http::error::{ClassifierRule, ErrorRules, MessageMatch};
use crate::protocol::types::{ChatRequest, ContentBlock, Message};
use crate::providers::error::{ErrorKind, GatewayResult};
use crate::providers::mapping::{model, ProviderMapper, RequestField};
use crate::providers::openai::chat::{
    max_completion_tokens, messages_with, tools, ChatDialect, CHAT_RESPONSE,
};
use serde_json::{json, Value};

pub const GROQ_DEFAULT_MODEL: &str = "openai/gpt-oss-20b";

pub const GROQ_DIALECT: ChatDialect = ChatDialect {
    system_role: "system",
};

pub static GROQ: ProviderMapper = ProviderMapper {
    name: "groq",
    endpoint: "chat/completions",
    request_fields: &[
        RequestField { wire_key: "model", build: model },
        RequestField { wire_key: "messages", build: messages },
        RequestField { wire_key: "temperature", build: temperature },
        RequestField { wire_key: "max_completion_tokens", build: max_completion_tokens },
        RequestField { wire_key: "response_format", build: response_format },
        RequestField { wire_key: "tools", build: tools },
    ],
    response_fields: CHAT_RESPONSE,
};

pub static GROQ_ERROR_RULES: ErrorRules = ErrorRules {
    code_field: "code",
    rules: &[
        ClassifierRule {
            status: 400,
            matcher: MessageMatch::ContainsIgnoreCase("reduce the length of the messages"),
            kind: ErrorKind::PromptTooLong,
            code_field: Some("type"),
        },
        ClassifierRule {
            status: 413,
            matcher: MessageMatch::Prefix("Request too large"),
            kind: ErrorKind::PromptTooLong,
            code_field: Some("type"),
        },
        ClassifierRule {
            status: 429,
            matcher: MessageMatch::CodeEquals("rate_limit_exceeded"),
            kind: ErrorKind::RateLimit,
            code_field: None,
        },
        ClassifierRule { status: 429, matcher: MessageMatch::Any, kind: ErrorKind::Overload, code_field: None },
    ],
};

fn messages(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    let degraded: Vec<Message> = request.messages.iter().map(degrade_files).collect();
    messages_with(request, &GROQ_DIALECT, &degraded)
}

/// Replace file blocks with their text, or a `[File: <name>]` marker
pub fn degrade_files(message: &Message) -> Message {
    let content = message
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::File { text: Some(text), .. } => ContentBlock::text(text.clone()),
            ContentBlock::File { name, .. } => {
                ContentBlock::text(format!("[File: {}]", name.as_deref().unwrap_or("unnamed")))
            }
            other => other.clone(),
        })
        .collect();
    Message {
        role: message.role,
        content,
        id: message.id.clone(),
    }
}

fn temperature(_: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(Some(json!(0)))
}

fn response_format(request: &ChatRequest) -> GatewayResult<Option<Value>> {
    Ok(Some(Value::from(request.response_format.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::classify;
    use crate::protocol::types::Role;

    #[test]
    fn test_prompt_too_long_reports_error_type() {
        let body = json!({"error": {
            "message": "Please reduce the length of the messages or completion.",
            "type": "invalid_request_error",
            "code": "context_length_exceeded"
        }});
        let err = classify(400, body.to_string().as_bytes(), &GROQ_ERROR_RULES);
        assert_eq!(err.kind(), ErrorKind::PromptTooLong);
        assert_eq!(err.code(), Some("invalid_request_error"));

        let body = json!({"error": {
            "message": "Rate limit reached",
            "type": "tokens",
            "code": "rate_limit_exceeded"
        }});
        let err = classify(429, body.to_string().as_bytes(), &GROQ_ERROR_RULES);
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.code(), Some("rate_limit_exceeded"));
    }

    #[test]
    fn test_body_shape() {
        let request = ChatRequest::new("llama-3.3-70b-versatile", vec![Message::user("hi")]).with_system("Be brief");
        let body = GROQ.map_request(&request).unwrap();
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            concat!(
                r#"{"model":"llama-3.3-70b-versatile","#,
                r#""messages":[{"role":"system","content":"Be brief"},{"role":"user","content":[{"type":"text","text":"hi"}]}],"#,
                r#""temperature":0,"max_completion_tokens":4096,"response_format":{"type":"text"}}"#
            )
        );
    }

    #[test]
    fn test_file_degrades_to_literal_text() {
        let message = Message::new(
            Role::User,
            vec![ContentBlock::File {
                data: String::new(),
                media_type: "text/plain".into(),
                name: Some("x.txt".into()),
                text: Some("body".into()),
            }],
        );
        assert_eq!(degrade_files(&message).content, vec![ContentBlock::text("body")]);
    }

    #[test]
    fn test_file_without_text_becomes_marker() {
        let message = Message::new(Role::User, vec![ContentBlock::file("x.txt", "text/plain", "data")]);
        let body = GROQ.map_request(&ChatRequest::new("llama-3.3-70b-versatile", vec![message])).unwrap();
        assert_eq!(
            body["messages"][0]["content"],
            json!([{"type": "text", "text": "[File: x.txt]"}])
        );
    }
}
