//! Canonical protocol types
//!
//! These are the provider-independent values every mapper reads or writes.
//! The design prioritizes:
//! - Lossless passthrough of content the gateway does not understand
//! - Deterministic serialization (field order is fixed by construction)
//! - Cheap construction from plain strings

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Default completion budget sent to providers
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Block types that only carry server-side tool bookkeeping
const INTERNAL_BLOCK_TYPES: &[&str] = &["server_tool_use", "code_execution_tool_result"];

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Developer,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Developer => "developer",
            Role::Tool => "tool",
        }
    }
}

/// One tagged unit of message content
///
/// Decoding never fails: any object that is not exactly one of the known
/// shapes is kept as [`ContentBlock::Raw`] and re-encoded unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ContentBlock {
    Text {
        text: String,
        cache_control: Option<Value>,
    },
    /// Image with base64 `data`
    Image { data: String, media_type: String },
    /// Document attachment. `data` holds the document bytes as text,
    /// `text` an optional plain-text rendition.
    File {
        data: String,
        media_type: String,
        name: Option<String>,
        text: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
        cache_control: Option<Value>,
    },
    Raw(Value),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: text.into(),
            cache_control: None,
        }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<Value>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            cache_control: None,
        }
    }

    pub fn file(
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        ContentBlock::File {
            data: data.into(),
            media_type: media_type.into(),
            name: Some(name.into()),
            text: None,
        }
    }

    /// Wire `type` tag of this block
    pub fn block_type(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { .. } => Some("text"),
            ContentBlock::Image { .. } => Some("image"),
            ContentBlock::File { .. } => Some("file"),
            ContentBlock::ToolUse { .. } => Some("tool_use"),
            ContentBlock::ToolResult { .. } => Some("tool_result"),
            ContentBlock::Raw(value) => value.get("type").and_then(Value::as_str),
        }
    }

    /// Text of a `Text` block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ContentBlock::Raw(_))
            && self
                .block_type()
                .is_some_and(|t| INTERNAL_BLOCK_TYPES.contains(&t))
    }

    fn decode(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let allowed: &[&str] = match object.get("type")?.as_str()? {
            "text" => &["type", "text", "cache_control"],
            "image" => &["type", "data", "media_type"],
            "file" => &["type", "data", "media_type", "name", "filename", "text"],
            "tool_use" => &["type", "id", "name", "input"],
            "tool_result" => &["type", "tool_use_id", "content", "cache_control"],
            _ => return None,
        };
        if object.keys().any(|key| !allowed.contains(&key.as_str())) {
            return None;
        }
        serde_json::from_value::<KnownBlock>(value.clone())
            .ok()
            .map(ContentBlock::from)
    }
}

/// Serde view of the recognized block shapes
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownBlock {
    Text {
        text: String,
        #[serde(default)]
        cache_control: Option<Value>,
    },
    Image {
        data: String,
        media_type: String,
    },
    File {
        #[serde(default)]
        data: String,
        #[serde(default)]
        media_type: String,
        #[serde(default, alias = "filename")]
        name: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        cache_control: Option<Value>,
    },
}

impl From<KnownBlock> for ContentBlock {
    fn from(block: KnownBlock) -> Self {
        match block {
            KnownBlock::Text { text, cache_control } => ContentBlock::Text { text, cache_control },
            KnownBlock::Image { data, media_type } => ContentBlock::Image { data, media_type },
            KnownBlock::File {
                data,
                media_type,
                name,
                text,
            } => ContentBlock::File {
                data,
                media_type,
                name,
                text,
            },
            KnownBlock::ToolUse { id, name, input } => ContentBlock::ToolUse { id, name, input },
            KnownBlock::ToolResult {
                tool_use_id,
                content,
                cache_control,
            } => ContentBlock::ToolResult {
                tool_use_id,
                content,
                cache_control,
            },
        }
    }
}

impl From<Value> for ContentBlock {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ContentBlock::text(text),
            other => ContentBlock::decode(&other).unwrap_or(ContentBlock::Raw(other)),
        }
    }
}

impl From<ContentBlock> for Value {
    fn from(block: ContentBlock) -> Self {
        let mut object = Map::new();
        match block {
            ContentBlock::Raw(value) => return value,
            ContentBlock::Text { text, cache_control } => {
                object.insert("type".into(), json!("text"));
                object.insert("text".into(), Value::String(text));
                if let Some(cache) = cache_control {
                    object.insert("cache_control".into(), cache);
                }
            }
            ContentBlock::Image { data, media_type } => {
                object.insert("type".into(), json!("image"));
                object.insert("data".into(), Value::String(data));
                object.insert("media_type".into(), Value::String(media_type));
            }
            ContentBlock::File {
                data,
                media_type,
                name,
                text,
            } => {
                object.insert("type".into(), json!("file"));
                object.insert("data".into(), Value::String(data));
                object.insert("media_type".into(), Value::String(media_type));
                if let Some(name) = name {
                    object.insert("name".into(), Value::String(name));
                }
                if let Some(text) = text {
                    object.insert("text".into(), Value::String(text));
                }
            }
            ContentBlock::ToolUse { id, name, input } => {
                object.insert("type".into(), json!("tool_use"));
                object.insert("id".into(), Value::String(id));
                object.insert("name".into(), Value::String(name));
                object.insert("input".into(), input);
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                cache_control,
            } => {
                object.insert("type".into(), json!("tool_result"));
                object.insert("tool_use_id".into(), Value::String(tool_use_id));
                object.insert("content".into(), content);
                if let Some(cache) = cache_control {
                    object.insert("cache_control".into(), cache);
                }
            }
        }
        Value::Object(object)
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    /// Ordered content; a bare string decodes as a single text block
    #[serde(deserialize_with = "deserialize_content", default)]
    pub content: Vec<ContentBlock>,

    /// Identifier of an already-serialized Responses API output item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            id: None,
        }
    }

    /// A user message with a single text block
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentInput {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Missing(()),
}

fn deserialize_content<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ContentInput::deserialize(deserializer)? {
        ContentInput::Text(text) => vec![ContentBlock::text(text)],
        ContentInput::Blocks(blocks) => blocks,
        ContentInput::Missing(()) => Vec::new(),
    })
}

/// System prompt, always an ordered sequence of blocks
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemPrompt(pub Vec<ContentBlock>);

impl SystemPrompt {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.0
    }
}

impl From<&str> for SystemPrompt {
    fn from(text: &str) -> Self {
        SystemPrompt(vec![ContentBlock::text(text)])
    }
}

impl From<String> for SystemPrompt {
    fn from(text: String) -> Self {
        SystemPrompt(vec![ContentBlock::text(text)])
    }
}

impl From<Vec<ContentBlock>> for SystemPrompt {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        SystemPrompt(blocks)
    }
}

/// Tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<Value>,
}

/// Either a caller-defined function tool or a provider-hosted tool such as
/// `{"type": "code_execution"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tool {
    Definition(ToolDefinition),
    Hosted(Value),
}

impl Tool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Tool::Definition(ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
            cache_control: None,
        })
    }

    /// Mark a function tool for prompt caching; hosted tools are unchanged
    pub fn cached(self) -> Self {
        match self {
            Tool::Definition(definition) => Tool::Definition(ToolDefinition {
                cache_control: Some(json!({ "type": "ephemeral" })),
                ..definition
            }),
            hosted => hosted,
        }
    }

    /// Name of a function tool, or the `type` of a hosted one
    pub fn name(&self) -> Option<&str> {
        match self {
            Tool::Definition(definition) => Some(&definition.name),
            Tool::Hosted(_) => self.hosted_type(),
        }
    }

    /// `type` of a hosted tool
    pub fn hosted_type(&self) -> Option<&str> {
        match self {
            Tool::Hosted(value) => value.get("type").and_then(Value::as_str),
            Tool::Definition(_) => None,
        }
    }
}

/// Requested output format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ResponseFormat {
    /// `{"type": <name>}`
    Type(String),
    /// Any other provider-specific shape, passed through
    Custom(Value),
}

impl Default for ResponseFormat {
    fn default() -> Self {
        ResponseFormat::Type("text".to_string())
    }
}

impl From<&str> for ResponseFormat {
    fn from(kind: &str) -> Self {
        ResponseFormat::Type(kind.to_string())
    }
}

impl From<Value> for ResponseFormat {
    fn from(value: Value) -> Self {
        match value {
            Value::String(kind) => ResponseFormat::Type(kind),
            Value::Object(ref object) if object.len() == 1 => match object.get("type") {
                Some(Value::String(kind)) => ResponseFormat::Type(kind.clone()),
                _ => ResponseFormat::Custom(value),
            },
            other => ResponseFormat::Custom(other),
        }
    }
}

impl From<ResponseFormat> for Value {
    fn from(format: ResponseFormat) -> Self {
        match format {
            ResponseFormat::Type(kind) => json!({ "type": kind }),
            ResponseFormat::Custom(value) => value,
        }
    }
}

/// Canonical chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub system: SystemPrompt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: SystemPrompt::default(),
            tools: None,
            response_format: ResponseFormat::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system(mut self, system: impl Into<SystemPrompt>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Tools, treating an empty list as absent
    pub fn tools(&self) -> Option<&[Tool]> {
        self.tools.as_deref().filter(|tools| !tools.is_empty())
    }
}

/// One candidate response turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Provider item id (Responses API only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl Choice {
    /// Convert this turn into a transcript message that can be sent back
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role.unwrap_or(Role::Assistant),
            content: self.content.clone(),
            id: self.id.clone(),
        }
    }
}

/// File generated by a hosted tool during the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub file_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

/// Canonical chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    /// Provider usage record, passed through untouched
    #[serde(default)]
    pub usage: Value,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<GeneratedFile>,
}

impl ChatResponse {
    /// Files generated by hosted tools
    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    /// Copy of this response without server-side tool bookkeeping blocks
    pub fn cleaned(&self) -> ChatResponse {
        let mut cleaned = self.clone();
        for choice in &mut cleaned.choices {
            choice.content.retain(|block| !block.is_internal());
        }
        cleaned
    }

    /// Concatenated text of the first choice
    pub fn text(&self) -> String {
        self.choices
            .first()
            .map(|choice| {
                choice
                    .content
                    .iter()
                    .filter_map(ContentBlock::as_text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Provider-independent file record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    pub size_bytes: u64,
    /// ISO-8601, microsecond precision
    pub created_at: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub downloadable: bool,
    pub purpose: String,
    pub expires_at: Option<String>,
}

/// File metadata plus content
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFile {
    pub metadata: FileMetadata,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_blocks_survive_round_trip() {
        let raw = json!({"type": "server_tool_use", "id": "srvtoolu_1", "name": "code_execution", "input": {}});
        let block: ContentBlock = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(block, ContentBlock::Raw(_)));
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn test_text_with_extra_fields_is_raw() {
        let raw = json!({"type": "text", "text": "hi", "citations": []});
        let block = ContentBlock::from(raw.clone());
        assert_eq!(block, ContentBlock::Raw(raw));
    }

    #[test]
    fn test_known_blocks_decode() {
        let block = ContentBlock::from(json!({"type": "tool_use", "id": "t1", "name": "f", "input": {"a": 1}}));
        assert_eq!(block, ContentBlock::tool_use("t1", "f", json!({"a": 1})));

        let file = ContentBlock::from(json!({"type": "file", "filename": "x.txt", "text": "body"}));
        assert_eq!(
            file,
            ContentBlock::File {
                data: String::new(),
                media_type: String::new(),
                name: Some("x.txt".to_string()),
                text: Some("body".to_string()),
            }
        );
    }

    #[test]
    fn test_message_content_accepts_string() {
        let message: Message = serde_json::from_value(json!({"role": "user", "content": "hi"})).unwrap();
        assert_eq!(message, Message::user("hi"));

        let empty: Message = serde_json::from_value(json!({"role": "assistant", "content": null})).unwrap();
        assert!(empty.content.is_empty());
    }

    #[test]
    fn test_response_format_conversions() {
        assert_eq!(ResponseFormat::from(json!("json_object")), ResponseFormat::Type("json_object".into()));
        assert_eq!(ResponseFormat::from(json!({"type": "text"})), ResponseFormat::default());

        let schema = json!({"type": "json_schema", "json_schema": {"name": "x"}});
        assert_eq!(ResponseFormat::from(schema.clone()), ResponseFormat::Custom(schema.clone()));
        assert_eq!(Value::from(ResponseFormat::Custom(schema.clone())), schema);
    }

    #[test]
    fn test_tool_definition_vs_hosted() {
        let tool: Tool = serde_json::from_value(json!({"type": "code_execution"})).unwrap();
        assert_eq!(tool.hosted_type(), Some("code_execution"));

        let tool: Tool = serde_json::from_value(json!({
            "name": "get_weather",
            "description": "Weather lookup",
            "input_schema": {"type": "object"}
        }))
        .unwrap();
        assert!(matches!(tool, Tool::Definition(_)));
    }

    #[test]
    fn test_cached_tool_serializes_marker() {
        let tool = Tool::function("get_weather", "Weather lookup", json!({"type": "object"})).cached();
        assert_eq!(tool.name(), Some("get_weather"));
        assert_eq!(
            serde_json::to_value(&tool).unwrap(),
            json!({
                "name": "get_weather",
                "description": "Weather lookup",
                "input_schema": {"type": "object"},
                "cache_control": {"type": "ephemeral"}
            })
        );

        let hosted = Tool::Hosted(json!({"type": "code_execution"})).cached();
        assert_eq!(hosted, Tool::Hosted(json!({"type": "code_execution"})));
        assert_eq!(hosted.name(), Some("code_execution"));
    }

    #[test]
    fn test_cleaned_drops_internal_blocks() {
        let response = ChatResponse {
            id: "msg_1".into(),
            model: "claude".into(),
            usage: json!({}),
            choices: vec![Choice {
                id: None,
                role: Some(Role::Assistant),
                finish_reason: Some("end_turn".into()),
                content: vec![
                    ContentBlock::from(json!({"type": "server_tool_use", "id": "s1"})),
                    ContentBlock::from(json!({"type": "code_execution_tool_result", "tool_use_id": "s1"})),
                    ContentBlock::text("done"),
                ],
            }],
            files: vec![],
        };

        let cleaned = response.cleaned();
        assert_eq!(cleaned.choices[0].content, vec![ContentBlock::text("done")]);
        assert_eq!(response.choices[0].content.len(), 3);
        assert_eq!(cleaned.text(), "done");
    }
}
