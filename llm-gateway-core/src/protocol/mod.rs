//! Protocol module for the canonical request/response model
//!
//! Every provider mapper reads and writes these values. They are:
//! - Provider-agnostic
//! - Lossless for content the gateway does not interpret
//! - Immutable once built for a call

pub mod normalize;
pub mod types;

pub use normalize::{
    messages_from_value, normalize, response_format_from_value, system_from_value, ChatOptions,
    Prompt,
};
pub use types::{
    ChatRequest, ChatResponse, Choice, ContentBlock, DownloadedFile, FileMetadata, GeneratedFile,
    Message, ResponseFormat, Role, SystemPrompt, Tool, ToolDefinition, DEFAULT_MAX_TOKENS,
};
