//! LLM Gateway Core Library
//!
//! A provider-agnostic gateway for chat-style LLM APIs. Callers speak one
//! canonical request/response model; the gateway maps it to Anthropic
//! Messages, OpenAI Chat Completions and Responses, or Groq, sends it and
//! maps the reply back.
//!
//! ```no_run
//! use llm_gateway_core::{ChatOptions, Router};
//!
//! # async fn run() -> llm_gateway_core::GatewayResult<()> {
//! let router = Router::default();
//! let response = router
//!     .chat("claude-sonnet-4-20250514", "Hello!", ChatOptions::new())
//!     .await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod oauth;
pub mod protocol;
pub mod providers;
pub mod template;

pub use protocol::{ChatOptions, ChatRequest, ChatResponse, ContentBlock, Message, Prompt, Role};
pub use providers::{
    Adapter, BuildConfig, ErrorKind, GatewayBuilder, GatewayError, GatewayResult, Router,
};
pub use template::PromptTemplate;

/// Returns the version of the gateway library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
