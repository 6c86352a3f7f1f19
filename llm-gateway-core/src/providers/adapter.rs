//! Provider adapter
//!
//! An adapter pairs one mapper with one API client and runs every call as
//! normalize, map, send, map back. OAuth clients additionally get the
//! refresh-and-retry-once policy.

use crate::http::{ApiBody, ApiClient};
use crate::protocol::normalize::{normalize, ChatOptions, Prompt};
use crate::protocol::types::{ChatRequest, ChatResponse, DownloadedFile, FileMetadata};
use crate::providers::error::{ErrorKind, GatewayError, GatewayResult};
use crate::providers::mapping::{FileOutputMapper, ProviderMapper};
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// Orchestrates one provider API surface
#[derive(Clone)]
pub struct Adapter {
    model: String,
    client: ApiClient,
    mapper: &'static ProviderMapper,
    file_mapper: Option<&'static dyn FileOutputMapper>,
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("model", &self.model)
            .field("mapper", &self.mapper.name)
            .field("client", &self.client)
            .field("supports_files", &self.file_mapper.is_some())
            .finish()
    }
}

impl Adapter {
    pub fn new(model: impl Into<String>, client: ApiClient, mapper: &'static ProviderMapper) -> Self {
        Self {
            model: model.into(),
            client,
            mapper,
            file_mapper: None,
        }
    }

    /// Enable file upload and download
    pub fn with_file_mapper(mut self, file_mapper: &'static dyn FileOutputMapper) -> Self {
        self.file_mapper = Some(file_mapper);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn mapper(&self) -> &'static ProviderMapper {
        self.mapper
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn supports_files(&self) -> bool {
        self.file_mapper.is_some()
    }

    /// Send a prompt to this adapter's model
    pub async fn chat(
        &self,
        prompt: impl Into<Prompt>,
        options: ChatOptions,
    ) -> GatewayResult<ChatResponse> {
        let request = normalize(&self.model, prompt.into(), options);
        self.send(&request).await
    }

    /// Send an already canonical request
    pub async fn send(&self, request: &ChatRequest) -> GatewayResult<ChatResponse> {
        let body = self.mapper.map_request(request)?;
        info!(
            "Sending chat request via {} for model {}",
            self.mapper.name, request.model
        );

        let endpoint = self.mapper.endpoint;
        let client = &self.client;
        let body = &body;
        let wire = self
            .authorized(move || client.post(endpoint, body, &[]))
            .await?
            .into_json()?;

        let response = self.mapper.map_response(&wire)?;
        debug!(
            "Received {} choice(s) from {} [id: {}]",
            response.choices.len(),
            self.mapper.name,
            response.id
        );
        Ok(response)
    }

    /// Upload a file to the provider's Files API
    pub async fn upload_file(
        &self,
        filename: &str,
        content: Vec<u8>,
        mime_type: &str,
        purpose: Option<&str>,
    ) -> GatewayResult<FileMetadata> {
        let files = self.file_mapper("upload_file")?;
        let fields = files.upload_fields(purpose);
        info!("Uploading {} ({} bytes) to {}", filename, content.len(), self.client.provider());

        let client = &self.client;
        let content = &content;
        let fields = &fields;
        let raw = self
            .authorized(move || {
                client.post_multipart("files", content.clone(), filename, mime_type, fields.clone())
            })
            .await?
            .into_json()?;
        files.map(&raw)
    }

    /// Fetch a file's metadata and content
    pub async fn download_file(&self, file_id: &str) -> GatewayResult<DownloadedFile> {
        let files = self.file_mapper("download_file")?;
        let metadata_path = format!("files/{}", file_id);
        let content_path = format!("files/{}/content", file_id);
        let client = &self.client;
        let (metadata_path, content_path) = (metadata_path.as_str(), content_path.as_str());

        let raw = self
            .authorized(move || client.get(metadata_path))
            .await?
            .into_json()?;
        let metadata = files.map(&raw)?;

        let content = self
            .authorized(move || client.get(content_path))
            .await?
            .into_bytes()?;
        debug!("Downloaded {} ({} bytes)", file_id, content.len());

        Ok(DownloadedFile { metadata, content })
    }

    fn file_mapper(&self, capability: &str) -> GatewayResult<&'static dyn FileOutputMapper> {
        self.file_mapper
            .ok_or_else(|| GatewayError::CapabilityNotSupported {
                provider: self.client.provider().to_string(),
                capability: capability.to_string(),
            })
    }

    /// Run `call`, applying the OAuth policy when the client uses tokens
    ///
    /// Make sure the token is valid, then send. If the send fails with
    /// `Authentication` while the token is expired, refresh once and send
    /// once more. Any other outcome, including a second failure, is returned.
    async fn authorized<F, Fut>(&self, call: F) -> GatewayResult<ApiBody>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GatewayResult<ApiBody>>,
    {
        let Some(tokens) = self.client.token_manager() else {
            return call().await;
        };

        tokens.ensure_valid().await?;
        match call().await {
            Err(err) if err.kind() == ErrorKind::Authentication => {
                if !tokens.is_expired().await {
                    return Err(err);
                }
                warn!("Authentication failed with an expired token; refreshing and retrying once");
                tokens.refresh().await?;
                call().await
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;
    use crate::http::{
        Credential, HeaderScheme, HttpRequest, HttpResponse, HttpTransport, RequestBody,
    };
    use crate::oauth::{TokenManager, TokenState};
    use crate::providers::anthropic::{CLAUDE, CLAUDE_ERROR_RULES, CLAUDE_OAUTH};
    use crate::providers::groq::{GROQ, GROQ_ERROR_RULES};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const TOKEN_URL: &str = "https://auth.test/oauth/token";

    /// Replays scripted responses per URL and records every request
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<Vec<(String, VecDeque<(u16, Value, Duration)>)>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn respond(self, url: &str, status: u16, body: Value) -> Self {
            self.respond_after(url, status, body, Duration::ZERO)
        }

        fn respond_after(self, url: &str, status: u16, body: Value, delay: Duration) -> Self {
            {
                let mut script = self.script.lock().unwrap();
                match script.iter_mut().find(|(u, _)| u == url) {
                    Some((_, queue)) => queue.push_back((status, body, delay)),
                    None => script.push((url.to_string(), VecDeque::from([(status, body, delay)]))),
                }
            }
            self
        }

        fn calls_to(&self, url: &str) -> usize {
            self.seen.lock().unwrap().iter().filter(|r| r.url == url).count()
        }

        fn bodies_to(&self, url: &str) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().iter().filter(|r| r.url == url).cloned().collect()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> GatewayResult<HttpResponse> {
            let url = request.url.clone();
            self.seen.lock().unwrap().push(request);
            let next = {
                let mut script = self.script.lock().unwrap();
                script
                    .iter_mut()
                    .find(|(u, _)| *u == url)
                    .and_then(|(_, queue)| queue.pop_front())
            };
            let (status, body, delay) = next.unwrap_or_else(|| panic!("unexpected call to {}", url));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let body = match body {
                Value::String(text) => text.into_bytes(),
                other => serde_json::to_vec(&other).unwrap(),
            };
            Ok(HttpResponse {
                status,
                headers: vec![("content-type".into(), "application/json".into())],
                body,
            })
        }
    }

    fn claude_reply(text: &str) -> Value {
        json!({
            "id": "msg_1",
            "model": "claude-sonnet-4",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 3, "output_tokens": 5},
            "content": [{"type": "text", "text": text}]
        })
    }

    fn key_adapter(transport: Arc<ScriptedTransport>) -> Adapter {
        let client = ApiClient::new(
            "anthropic",
            "https://claude.test/v1",
            HeaderScheme::Anthropic,
            Credential::ApiKey(SecretString::new("sk-ant")),
            &CLAUDE_ERROR_RULES,
            transport,
        )
        .unwrap();
        Adapter::new("claude-x", client, &CLAUDE)
    }

    fn oauth_adapter(transport: Arc<ScriptedTransport>, expires_in: ChronoDuration) -> Adapter {
        let state = TokenState::new("rt-1")
            .with_access_token("at-1")
            .with_expires_at(Some(Utc::now() + expires_in))
            .with_client("client", "secret");
        let manager = TokenManager::builder(state, transport.clone())
            .token_url(TOKEN_URL)
            .build();
        let client = ApiClient::new(
            "anthropic",
            "https://claude.test/v1",
            HeaderScheme::AnthropicOAuth,
            Credential::OAuth(manager),
            &CLAUDE_ERROR_RULES,
            transport,
        )
        .unwrap();
        Adapter::new("claude_code/claude-sonnet-4", client, &CLAUDE_OAUTH)
    }

    fn bearer(request: &HttpRequest) -> Option<&str> {
        request.header("authorization")
    }

    #[tokio::test]
    async fn test_chat_maps_both_ways() {
        let transport = Arc::new(
            ScriptedTransport::default().respond("https://claude.test/v1/messages", 200, claude_reply("Hello")),
        );
        let adapter = key_adapter(transport.clone());

        let response = adapter.chat("hi", ChatOptions::new()).await.unwrap();
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("end_turn"));
        assert_eq!(response.usage, json!({"input_tokens": 3, "output_tokens": 5}));

        let sent = transport.bodies_to("https://claude.test/v1/messages");
        let RequestBody::Json(bytes) = &sent[0].body else {
            panic!("expected a JSON body");
        };
        let body: Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-x",
                "max_tokens": 4096,
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
            })
        );
    }

    #[tokio::test]
    async fn test_api_key_client_never_retries() {
        let transport = Arc::new(ScriptedTransport::default().respond(
            "https://claude.test/v1/messages",
            401,
            json!({"error": {"type": "authentication_error", "message": "invalid x-api-key"}}),
        ));
        let adapter = key_adapter(transport.clone());

        let err = adapter.chat("hi", ChatOptions::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(transport.calls_to("https://claude.test/v1/messages"), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_with_valid_token_propagates() {
        let transport = Arc::new(ScriptedTransport::default().respond(
            "https://claude.test/v1/messages",
            401,
            json!({"error": {"type": "authentication_error", "message": "revoked"}}),
        ));
        let adapter = oauth_adapter(transport.clone(), ChronoDuration::hours(1));

        let err = adapter.chat("hi", ChatOptions::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(transport.calls_to(TOKEN_URL), 0);
        assert_eq!(transport.calls_to("https://claude.test/v1/messages"), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_before_sending() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .respond(TOKEN_URL, 200, json!({"access_token": "at-2", "expires_in": 3600}))
                .respond("https://claude.test/v1/messages", 200, claude_reply("ok")),
        );
        let adapter = oauth_adapter(transport.clone(), ChronoDuration::hours(-1));

        adapter.chat("hi", ChatOptions::new()).await.unwrap();
        assert_eq!(transport.calls_to(TOKEN_URL), 1);
        let sent = transport.bodies_to("https://claude.test/v1/messages");
        assert_eq!(bearer(&sent[0]), Some("Bearer at-2"));
    }

    #[tokio::test]
    async fn test_token_expiring_in_flight_retries_once() {
        // The first send outlives the token, so the 401 arrives after expiry
        let transport = Arc::new(
            ScriptedTransport::default()
                .respond_after(
                    "https://claude.test/v1/messages",
                    401,
                    json!({"error": {"type": "authentication_error", "message": "expired"}}),
                    Duration::from_millis(400),
                )
                .respond("https://claude.test/v1/messages", 200, claude_reply("again"))
                .respond(TOKEN_URL, 200, json!({"access_token": "at-2", "expires_in": 3600})),
        );
        let adapter = oauth_adapter(transport.clone(), ChronoDuration::milliseconds(200));

        let response = adapter.chat("hi", ChatOptions::new()).await.unwrap();
        assert_eq!(response.text(), "again");
        assert_eq!(transport.calls_to(TOKEN_URL), 1);

        let sent = transport.bodies_to("https://claude.test/v1/messages");
        assert_eq!(sent.len(), 2);
        assert_eq!(bearer(&sent[0]), Some("Bearer at-1"));
        assert_eq!(bearer(&sent[1]), Some("Bearer at-2"));
    }

    #[tokio::test]
    async fn test_retry_failure_is_not_retried_again() {
        let unauthorized = json!({"error": {"type": "authentication_error", "message": "expired"}});
        let transport = Arc::new(
            ScriptedTransport::default()
                .respond_after(
                    "https://claude.test/v1/messages",
                    401,
                    unauthorized.clone(),
                    Duration::from_millis(400),
                )
                .respond_after(
                    "https://claude.test/v1/messages",
                    401,
                    unauthorized,
                    Duration::from_millis(400),
                )
                .respond(TOKEN_URL, 200, json!({"access_token": "at-2", "expires_in": 0})),
        );
        let adapter = oauth_adapter(transport.clone(), ChronoDuration::milliseconds(200));

        let err = adapter.chat("hi", ChatOptions::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(transport.calls_to("https://claude.test/v1/messages"), 2);
        assert_eq!(transport.calls_to(TOKEN_URL), 1);
    }

    #[tokio::test]
    async fn test_file_operations_need_a_file_mapper() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = ApiClient::new(
            "groq",
            "https://groq.test/openai/v1",
            HeaderScheme::Bearer,
            Credential::ApiKey(SecretString::new("gsk")),
            &GROQ_ERROR_RULES,
            transport.clone(),
        )
        .unwrap();
        let adapter = Adapter::new("llama-3.3-70b-versatile", client, &GROQ);

        let err = adapter
            .upload_file("a.txt", b"abc".to_vec(), "text/plain", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityNotSupported);
        assert_eq!(
            err.to_string(),
            "Capability 'upload_file' is not supported by provider 'groq'"
        );

        let err = adapter.download_file("file-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityNotSupported);
        assert!(transport.seen.lock().unwrap().is_empty());
    }
}
