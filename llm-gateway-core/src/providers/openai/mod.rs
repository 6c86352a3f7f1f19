//! OpenAI provider mappings
//!
//! Two API surfaces share one transport: Chat Completions (the default) and
//! Responses.

pub mod chat;
pub mod files;
pub mod responses;
pub mod types;

use crate::http::error::{ClassifierRule, ErrorRules, MessageMatch};
use crate::providers::error::ErrorKind;

pub use chat::OPENAI_CHAT;
pub use files::OpenAiFileMapper;
pub use responses::OPENAI_RESPONSES;

/// Model used when a build names none
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";

pub static OPENAI_ERROR_RULES: ErrorRules = ErrorRules {
    code_field: "code",
    rules: &[
        ClassifierRule { status: 429, matcher: MessageMatch::Any, kind: ErrorKind::RateLimit, code_field: None },
        ClassifierRule { status: 503, matcher: MessageMatch::Any, kind: ErrorKind::Overload, code_field: None },
    ],
};
