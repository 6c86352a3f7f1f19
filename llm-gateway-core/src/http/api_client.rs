//! Provider API client
//!
//! Builds authenticated requests against one provider base URL, executes
//! them through an [`HttpTransport`], and turns failures into gateway errors.

use crate::config::SecretString;
use crate::http::error::{classify, ErrorRules};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, Method, MultipartForm, RequestBody};
use crate::oauth::TokenManager;
use crate::providers::error::{GatewayError, GatewayResult};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_BETA: &str = "code-execution-2025-05-22,files-api-2025-04-14";
pub const CLAUDE_CODE_VERSION: &str = "2.1.2";
pub const CLAUDE_CODE_BETA: &str = "claude-code-20250219,oauth-2025-04-20";

/// Header set a provider expects on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderScheme {
    /// `x-api-key` plus Anthropic version and beta headers
    Anthropic,
    /// Bearer token plus the Claude Code client identity headers
    AnthropicOAuth,
    /// `Authorization: Bearer <key>`
    Bearer,
}

/// How the client authenticates
#[derive(Clone)]
pub enum Credential {
    ApiKey(SecretString),
    OAuth(TokenManager),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(key) => f.debug_tuple("ApiKey").field(&key.partial_redact()).finish(),
            Credential::OAuth(manager) => f.debug_tuple("OAuth").field(manager).finish(),
        }
    }
}

/// Decoded success body
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Raw(Vec<u8>),
}

impl ApiBody {
    /// The body as JSON, parsing raw bytes when needed
    pub fn into_json(self) -> GatewayResult<Value> {
        match self {
            ApiBody::Json(value) => Ok(value),
            ApiBody::Raw(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                GatewayError::InvalidResponse(format!("Expected a JSON body: {}", e))
            }),
        }
    }

    /// The body as bytes, re-encoding JSON when needed
    pub fn into_bytes(self) -> GatewayResult<Vec<u8>> {
        match self {
            ApiBody::Json(value) => Ok(serde_json::to_vec(&value)?),
            ApiBody::Raw(bytes) => Ok(bytes),
        }
    }
}

/// Client for one provider endpoint
#[derive(Clone)]
pub struct ApiClient {
    provider: &'static str,
    base_url: String,
    scheme: HeaderScheme,
    credential: Credential,
    rules: &'static ErrorRules,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("scheme", &self.scheme)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client; `base_url` must be an absolute http(s) URL
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        scheme: HeaderScheme,
        credential: Credential,
        rules: &'static ErrorRules,
        transport: Arc<dyn HttpTransport>,
    ) -> GatewayResult<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|e| {
            GatewayError::Configuration(format!("Invalid base URL '{}': {}", base_url, e))
        })?;

        Ok(Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            scheme,
            credential,
            rules,
            transport,
        })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token manager for OAuth clients
    pub fn token_manager(&self) -> Option<&TokenManager> {
        match &self.credential {
            Credential::OAuth(manager) => Some(manager),
            Credential::ApiKey(_) => None,
        }
    }

    /// Full URL for `path`; a leading slash on `path` is ignored
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> GatewayResult<ApiBody> {
        self.execute(Method::Get, path, RequestBody::Empty, &[]).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        extra_headers: &[(String, String)],
    ) -> GatewayResult<ApiBody> {
        let bytes = serde_json::to_vec(body)?;
        self.execute(Method::Post, path, RequestBody::Json(bytes), extra_headers)
            .await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        file: Vec<u8>,
        filename: &str,
        mime_type: &str,
        extra_fields: Vec<(String, String)>,
    ) -> GatewayResult<ApiBody> {
        let form = MultipartForm {
            file,
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            fields: extra_fields,
        };
        self.execute(Method::Post, path, RequestBody::Multipart(form), &[])
            .await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        extra_headers: &[(String, String)],
    ) -> GatewayResult<ApiBody> {
        let request_id = Uuid::new_v4();
        let multipart = matches!(body, RequestBody::Multipart(_));

        let mut headers = self.headers(multipart).await?;
        for (name, value) in extra_headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        let request = HttpRequest {
            method,
            url: self.url(path),
            headers,
            body,
        };

        info!(
            "Executing {} {} on {} [request_id: {}]",
            method.as_str(),
            path,
            self.provider,
            request_id
        );
        debug!("Request URL: {} [request_id: {}]", request.url, request_id);

        let response = self.transport.send(request).await?;
        debug!("Response status: {} [request_id: {}]", response.status, request_id);

        if !response.is_success() {
            let err = classify(response.status, &response.body, self.rules);
            warn!(
                "Request failed with status {} for {} ({}) [request_id: {}]",
                response.status,
                self.provider,
                err.kind(),
                request_id
            );
            return Err(err);
        }

        decode(response)
    }

    async fn headers(&self, multipart: bool) -> GatewayResult<Vec<(String, String)>> {
        let mut headers: Vec<(String, String)> = Vec::with_capacity(7);
        let mut push = |name: &str, value: &str| headers.push((name.to_string(), value.to_string()));

        match (&self.scheme, &self.credential) {
            (HeaderScheme::Anthropic, Credential::ApiKey(key)) => {
                push("anthropic-version", ANTHROPIC_VERSION);
                if !multipart {
                    push("content-type", "application/json");
                }
                push("x-api-key", key.expose_secret());
                push("anthropic-beta", ANTHROPIC_BETA);
            }
            (HeaderScheme::AnthropicOAuth, Credential::OAuth(manager)) => {
                let token = manager.access_token().await.ok_or_else(|| {
                    GatewayError::authentication("No OAuth access token available", None)
                })?;
                push("anthropic-version", ANTHROPIC_VERSION);
                if !multipart {
                    push("content-type", "application/json");
                }
                push(
                    "authorization",
                    &format!("Bearer {}", token.expose_secret()),
                );
                push("anthropic-dangerous-direct-browser-access", "true");
                push("anthropic-beta", CLAUDE_CODE_BETA);
                push(
                    "user-agent",
                    &format!("claude-cli/{} (external, cli)", CLAUDE_CODE_VERSION),
                );
                push("x-app", "cli");
            }
            (HeaderScheme::Bearer, Credential::ApiKey(key)) => {
                if !multipart {
                    push("content-type", "application/json");
                }
                push("authorization", &format!("Bearer {}", key.expose_secret()));
            }
            (scheme, _) => {
                return Err(GatewayError::Configuration(format!(
                    "Credential type does not match header scheme {:?} for {}",
                    scheme, self.provider
                )))
            }
        }

        Ok(headers)
    }
}

fn decode(response: HttpResponse) -> GatewayResult<ApiBody> {
    if response.is_json() && !response.body.is_empty() {
        let value = serde_json::from_slice(&response.body).map_err(|e| {
            GatewayError::InvalidResponse(format!("Malformed JSON response: {}", e))
        })?;
        Ok(ApiBody::Json(value))
    } else {
        Ok(ApiBody::Raw(response.body))
    }
}
