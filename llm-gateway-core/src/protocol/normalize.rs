//! Turning loose caller input into canonical values

use super::types::{
    ChatRequest, ContentBlock, Message, ResponseFormat, Role, SystemPrompt, Tool, DEFAULT_MAX_TOKENS,
};
use crate::providers::error::{GatewayError, GatewayResult};
use serde_json::Value;

/// What the caller wants answered: a bare string or a full transcript
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Text(String),
    Messages(Vec<Message>),
}

impl Prompt {
    /// Canonical message list. A bare string becomes one user message.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Prompt::Text(text) => vec![Message::user(text)],
            Prompt::Messages(messages) => messages,
        }
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::Text(text.to_string())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Prompt::Text(text)
    }
}

impl From<Message> for Prompt {
    fn from(message: Message) -> Self {
        Prompt::Messages(vec![message])
    }
}

impl From<Vec<Message>> for Prompt {
    fn from(messages: Vec<Message>) -> Self {
        Prompt::Messages(messages)
    }
}

/// Optional arguments to a chat call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub system: SystemPrompt,
    pub tools: Option<Vec<Tool>>,
    pub response_format: ResponseFormat,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, system: impl Into<SystemPrompt>) -> Self {
        self.system = system.into();
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn response_format(mut self, format: impl Into<ResponseFormat>) -> Self {
        self.response_format = format.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Build the canonical request for `model`
pub fn normalize(model: &str, prompt: Prompt, options: ChatOptions) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: prompt.into_messages(),
        system: options.system,
        tools: options.tools,
        response_format: options.response_format,
        max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    }
}

/// Messages from untyped input: a string or a message array
pub fn messages_from_value(value: Value) -> GatewayResult<Vec<Message>> {
    match value {
        Value::String(text) => Ok(vec![Message::user(text)]),
        Value::Array(_) => serde_json::from_value(value)
            .map_err(|e| GatewayError::InvalidArgument(format!("invalid messages: {}", e))),
        Value::Object(_) => serde_json::from_value::<Message>(value)
            .map(|message| vec![message])
            .map_err(|e| GatewayError::InvalidArgument(format!("invalid message: {}", e))),
        other => Err(GatewayError::InvalidArgument(format!(
            "message must be a string or an array, got {}",
            other
        ))),
    }
}

/// System prompt from untyped input
///
/// Accepts `null`, a string, or an array whose entries are content blocks,
/// strings, or `{"role": "system", "content": ...}` messages.
pub fn system_from_value(value: &Value) -> GatewayResult<SystemPrompt> {
    match value {
        Value::Null => Ok(SystemPrompt::default()),
        Value::String(text) => Ok(SystemPrompt::from(text.as_str())),
        Value::Array(entries) => {
            let mut blocks = Vec::with_capacity(entries.len());
            for entry in entries {
                match system_message_content(entry) {
                    Some(content) => blocks.extend(content),
                    None => blocks.push(ContentBlock::from(entry.clone())),
                }
            }
            Ok(SystemPrompt(blocks))
        }
        other => Err(GatewayError::InvalidArgument(format!(
            "system must be nil, a string or an array, got {}",
            other
        ))),
    }
}

fn system_message_content(entry: &Value) -> Option<Vec<ContentBlock>> {
    let role = entry.get("role")?.as_str()?;
    if role != Role::System.as_str() {
        return None;
    }
    match entry.get("content")? {
        Value::String(text) => Some(vec![ContentBlock::Text {
            text: text.clone(),
            cache_control: entry.get("cache_control").cloned(),
        }]),
        Value::Array(parts) => Some(parts.iter().cloned().map(ContentBlock::from).collect()),
        _ => None,
    }
}

/// Response format from untyped input; `null` means the default
pub fn response_format_from_value(value: Value) -> ResponseFormat {
    match value {
        Value::Null => ResponseFormat::default(),
        other => ResponseFormat::from(other),
    }
}
