//! Reusable prompts with execution hooks
//!
//! A [`PromptTemplate`] bundles a prompt with its system prompt and tools,
//! and runs it through an [`Adapter`]:
//! 1. `before_execute` hooks see the prompt
//! 2. the chat call is made
//! 3. the extractor pulls content out of the response
//! 4. an optional parser turns that content into a result
//! 5. `after_execute` hooks see the response and the extracted content

use crate::protocol::{ChatOptions, ChatResponse, ContentBlock, Prompt, SystemPrompt, Tool};
use crate::providers::{Adapter, GatewayError, GatewayResult};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Runs before the chat call
pub type BeforeExecute = Arc<dyn Fn(&Prompt) + Send + Sync>;

/// Runs after a successful call with the response and the extracted content
pub type AfterExecute = Arc<dyn Fn(&ChatResponse, &[ContentBlock]) + Send + Sync>;

/// Pulls the interesting content out of a response
pub type ResponseExtractor = Arc<dyn Fn(&ChatResponse) -> GatewayResult<Vec<ContentBlock>> + Send + Sync>;

/// A prompt that can be run repeatedly against any adapter
#[derive(Clone)]
pub struct PromptTemplate {
    prompt: Prompt,
    options: ChatOptions,
    before: Vec<BeforeExecute>,
    after: Vec<AfterExecute>,
    extractor: Option<ResponseExtractor>,
}

impl fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("prompt", &self.prompt)
            .field("options", &self.options)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish_non_exhaustive()
    }
}

impl PromptTemplate {
    pub fn new(prompt: impl Into<Prompt>) -> Self {
        Self {
            prompt: prompt.into(),
            options: ChatOptions::new(),
            before: Vec::new(),
            after: Vec::new(),
            extractor: None,
        }
    }

    pub fn system(mut self, system: impl Into<SystemPrompt>) -> Self {
        self.options = self.options.system(system);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.options = self.options.tools(tools);
        self
    }

    /// Replace all chat options at once
    pub fn options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a hook run before every call, in registration order
    pub fn before_execute<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Prompt) + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    /// Register a hook run after every successful call, in registration order
    pub fn after_execute<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ChatResponse, &[ContentBlock]) + Send + Sync + 'static,
    {
        self.after.push(Arc::new(hook));
        self
    }

    /// Override the default extractor, which takes the first choice's content
    pub fn extract_response<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&ChatResponse) -> GatewayResult<Vec<ContentBlock>> + Send + Sync + 'static,
    {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Tool with the given name, if this template offers one
    pub fn find_tool(&self, name: &str) -> Option<&Tool> {
        self.options
            .tools
            .as_deref()?
            .iter()
            .find(|tool| tool.name() == Some(name))
    }

    /// Run and return the extracted content
    pub async fn run(&self, adapter: &Adapter) -> GatewayResult<Vec<ContentBlock>> {
        self.run_parsed(adapter, Ok).await
    }

    /// Run and turn the extracted content into `T`
    ///
    /// `after_execute` hooks only run once parsing has succeeded.
    pub async fn run_parsed<T, P>(&self, adapter: &Adapter, parse: P) -> GatewayResult<T>
    where
        P: FnOnce(Vec<ContentBlock>) -> GatewayResult<T>,
    {
        for hook in &self.before {
            hook(&self.prompt);
        }

        debug!("Running prompt template on {}", adapter.model());
        let response = adapter.chat(self.prompt.clone(), self.options.clone()).await?;

        let content = match &self.extractor {
            Some(extractor) => extractor(&response)?,
            None => first_choice_content(&response)?,
        };
        let result = parse(content.clone())?;

        for hook in &self.after {
            hook(&response, &content);
        }
        Ok(result)
    }
}

fn first_choice_content(response: &ChatResponse) -> GatewayResult<Vec<ContentBlock>> {
    response
        .choices
        .first()
        .map(|choice| choice.content.clone())
        .ok_or_else(|| GatewayError::InvalidResponse("Response has no choices".to_string()))
}
