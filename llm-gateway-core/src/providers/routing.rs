//! Provider resolution
//!
//! Two entry points produce an [`Adapter`]:
//! - [`GatewayBuilder::build`] from an explicit `{provider, type, api, ...}` record
//! - [`Router`] from a bare model name, matched by prefix
//!
//! Both consult the immutable [`ProviderRegistry`].

use crate::config::env::{ANTHROPIC_CLIENT_ID, ANTHROPIC_CLIENT_SECRET};
use crate::config::{CredentialsConfig, EndpointConfig, GatewayConfig, SecretString};
use crate::http::error::ErrorRules;
use crate::http::{ApiClient, Credential, HeaderScheme, HttpTransport, ReqwestTransport};
use crate::oauth::{parse_expires_at, RefreshCallback, RefreshedTokens, TokenManager, TokenState};
use crate::protocol::normalize::{ChatOptions, Prompt};
use crate::protocol::types::ChatResponse;
use crate::providers::adapter::Adapter;
use crate::providers::anthropic::{
    ClaudeFileMapper, CLAUDE, CLAUDE_CODE_MODEL_PREFIX, CLAUDE_DEFAULT_MODEL, CLAUDE_ERROR_RULES,
    CLAUDE_OAUTH,
};
use crate::providers::error::{GatewayError, GatewayResult};
use crate::providers::groq::{GROQ, GROQ_DEFAULT_MODEL, GROQ_ERROR_RULES};
use crate::providers::mapping::{FileOutputMapper, ProviderMapper};
use crate::providers::openai::{
    OpenAiFileMapper, OPENAI_CHAT, OPENAI_DEFAULT_MODEL, OPENAI_ERROR_RULES, OPENAI_RESPONSES,
};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Transport client flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Claude,
    ClaudeOAuth,
    OpenAi,
    Groq,
}

impl TransportKind {
    pub fn provider(&self) -> &'static str {
        match self {
            TransportKind::Claude | TransportKind::ClaudeOAuth => "anthropic",
            TransportKind::OpenAi => "openai",
            TransportKind::Groq => "groq",
        }
    }

    pub fn header_scheme(&self) -> HeaderScheme {
        match self {
            TransportKind::Claude => HeaderScheme::Anthropic,
            TransportKind::ClaudeOAuth => HeaderScheme::AnthropicOAuth,
            TransportKind::OpenAi | TransportKind::Groq => HeaderScheme::Bearer,
        }
    }

    pub fn error_rules(&self) -> &'static ErrorRules {
        match self {
            TransportKind::Claude | TransportKind::ClaudeOAuth => &CLAUDE_ERROR_RULES,
            TransportKind::OpenAi => &OPENAI_ERROR_RULES,
            TransportKind::Groq => &GROQ_ERROR_RULES,
        }
    }

    pub fn base_url<'a>(&self, endpoints: &'a EndpointConfig) -> &'a str {
        match self {
            TransportKind::Claude | TransportKind::ClaudeOAuth => &endpoints.anthropic,
            TransportKind::OpenAi => &endpoints.openai,
            TransportKind::Groq => &endpoints.groq,
        }
    }
}

/// Mapper pair for one API surface
#[derive(Clone, Copy)]
pub struct MapperSet {
    pub chat: &'static ProviderMapper,
    pub files: Option<&'static dyn FileOutputMapper>,
}

impl fmt::Debug for MapperSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperSet")
            .field("chat", &self.chat.name)
            .field("files", &self.files.is_some())
            .finish()
    }
}

/// A transport and the mappers it runs by default
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub transport: TransportKind,
    pub mappers: MapperSet,
    pub default_model: Option<&'static str>,
}

/// How a provider chooses its binding from the auth type
#[derive(Debug, Clone, Copy)]
pub enum AuthSelection {
    /// The auth type is ignored
    Any(Binding),
    /// Each auth type selects a distinct transport and mapper pair
    ByType(&'static [(&'static str, Binding)]),
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderEntry {
    pub id: &'static str,
    pub auth: AuthSelection,
    /// Alternate API surfaces; these swap the mappers and keep the transport
    pub api_variants: &'static [(&'static str, MapperSet)],
}

/// The outcome of a registry lookup
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    pub transport: TransportKind,
    pub mappers: MapperSet,
    pub default_model: Option<&'static str>,
}

const CLAUDE_MAPPERS: MapperSet = MapperSet {
    chat: &CLAUDE,
    files: Some(&ClaudeFileMapper),
};

const CLAUDE_OAUTH_MAPPERS: MapperSet = MapperSet {
    chat: &CLAUDE_OAUTH,
    files: Some(&ClaudeFileMapper),
};

const OPENAI_CHAT_MAPPERS: MapperSet = MapperSet {
    chat: &OPENAI_CHAT,
    files: Some(&OpenAiFileMapper),
};

const OPENAI_RESPONSES_MAPPERS: MapperSet = MapperSet {
    chat: &OPENAI_RESPONSES,
    files: Some(&OpenAiFileMapper),
};

const GROQ_MAPPERS: MapperSet = MapperSet {
    chat: &GROQ,
    files: None,
};

static STANDARD: ProviderRegistry = ProviderRegistry {
    entries: &[
        ProviderEntry {
            id: "groq",
            auth: AuthSelection::Any(Binding {
                transport: TransportKind::Groq,
                mappers: GROQ_MAPPERS,
                default_model: Some(GROQ_DEFAULT_MODEL),
            }),
            api_variants: &[],
        },
        ProviderEntry {
            id: "anthropic",
            auth: AuthSelection::ByType(&[
                (
                    "api_key",
                    Binding {
                        transport: TransportKind::Claude,
                        mappers: CLAUDE_MAPPERS,
                        default_model: Some(CLAUDE_DEFAULT_MODEL),
                    },
                ),
                (
                    "oauth",
                    Binding {
                        transport: TransportKind::ClaudeOAuth,
                        mappers: CLAUDE_OAUTH_MAPPERS,
                        default_model: Some(CLAUDE_DEFAULT_MODEL),
                    },
                ),
            ]),
            api_variants: &[],
        },
        ProviderEntry {
            id: "openai",
            auth: AuthSelection::Any(Binding {
                transport: TransportKind::OpenAi,
                mappers: OPENAI_CHAT_MAPPERS,
                default_model: Some(OPENAI_DEFAULT_MODEL),
            }),
            api_variants: &[
                ("completions", OPENAI_CHAT_MAPPERS),
                ("responses", OPENAI_RESPONSES_MAPPERS),
            ],
        },
    ],
};

/// Immutable table of known providers
#[derive(Debug)]
pub struct ProviderRegistry {
    entries: &'static [ProviderEntry],
}

impl ProviderRegistry {
    /// The built-in providers
    pub fn standard() -> &'static ProviderRegistry {
        &STANDARD
    }

    pub fn provider_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }

    /// Resolve a provider id, auth type and optional API variant
    ///
    /// An unknown API variant falls back to the provider's default mappers.
    pub fn resolve(
        &self,
        provider: &str,
        auth_type: Option<&str>,
        api: Option<&str>,
    ) -> GatewayResult<Resolved> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.id == provider)
            .ok_or_else(|| {
                GatewayError::UnsupportedProvider(format!("Unknown provider: {}", provider))
            })?;

        let binding = match entry.auth {
            AuthSelection::Any(binding) => binding,
            AuthSelection::ByType(bindings) => {
                let auth_type = auth_type.unwrap_or_default();
                bindings
                    .iter()
                    .find(|(name, _)| *name == auth_type)
                    .map(|(_, binding)| *binding)
                    .ok_or_else(|| {
                        GatewayError::UnsupportedProvider(format!(
                            "Unknown auth type '{}' for provider '{}'",
                            auth_type, provider
                        ))
                    })?
            }
        };

        let mappers = api
            .and_then(|api| {
                entry
                    .api_variants
                    .iter()
                    .find(|(name, _)| *name == api)
                    .map(|(_, mappers)| *mappers)
            })
            .unwrap_or(binding.mappers);

        Ok(Resolved {
            transport: binding.transport,
            mappers,
            default_model: binding.default_model,
        })
    }
}

/// Build record accepted by [`GatewayBuilder::build`]
///
/// Field names accept both snake_case and the camelCase spellings used by
/// JSON clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    pub provider: String,
    #[serde(default, rename = "type", alias = "authType", alias = "auth_type")]
    pub auth_type: Option<String>,
    #[serde(default, alias = "apiVariant")]
    pub api: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "key", alias = "apiKey", alias = "api_key")]
    pub api_key: Option<SecretString>,
    #[serde(default, rename = "accessToken", alias = "access_token")]
    pub access_token: Option<SecretString>,
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<SecretString>,
    /// RFC 3339 string or epoch number
    #[serde(default, rename = "expiresAt", alias = "expires_at")]
    pub expires_at: Option<Value>,
    #[serde(default, rename = "clientId", alias = "client_id")]
    pub client_id: Option<String>,
    #[serde(default, rename = "clientSecret", alias = "client_secret")]
    pub client_secret: Option<SecretString>,
    #[serde(default, rename = "baseUrl", alias = "base_url")]
    pub base_url: Option<String>,
}

impl BuildConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn with_auth_type(mut self, auth_type: impl Into<String>) -> Self {
        self.auth_type = Some(auth_type.into());
        self
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<SecretString>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_tokens(
        mut self,
        access_token: Option<SecretString>,
        refresh_token: impl Into<SecretString>,
        expires_at: Option<Value>,
    ) -> Self {
        self.access_token = access_token;
        self.refresh_token = Some(refresh_token.into());
        self.expires_at = expires_at;
        self
    }

    pub fn with_client(mut self, client_id: impl Into<String>, secret: impl Into<SecretString>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

/// Turns [`BuildConfig`] records into ready adapters
#[derive(Clone)]
pub struct GatewayBuilder {
    registry: &'static ProviderRegistry,
    config: GatewayConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    on_token_refresh: Option<RefreshCallback>,
}

impl fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::standard(),
            config: GatewayConfig::default(),
            transport: None,
            on_token_refresh: None,
        }
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Share one transport across every adapter this builder creates
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Callback for refreshed OAuth tokens, so callers can persist them
    pub fn on_token_refresh<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RefreshedTokens) + Send + Sync + 'static,
    {
        self.on_token_refresh = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn build(&self, build: &BuildConfig) -> GatewayResult<Adapter> {
        let resolved = self.registry.resolve(
            &build.provider,
            build.auth_type.as_deref(),
            build.api.as_deref(),
        )?;

        let model = build
            .model
            .clone()
            .or_else(|| resolved.default_model.map(str::to_string))
            .ok_or_else(|| {
                GatewayError::InvalidArgument(format!(
                    "A model is required for provider '{}'",
                    build.provider
                ))
            })?;

        let transport = self.transport()?;
        let credential = match resolved.transport {
            TransportKind::ClaudeOAuth => {
                Credential::OAuth(self.token_manager(build, Arc::clone(&transport)))
            }
            kind => Credential::ApiKey(build.api_key.clone().ok_or_else(|| {
                GatewayError::Configuration(format!(
                    "No API key configured for provider '{}'",
                    kind.provider()
                ))
            })?),
        };

        let base_url = build
            .base_url
            .as_deref()
            .unwrap_or_else(|| resolved.transport.base_url(&self.config.endpoints));
        let client = ApiClient::new(
            resolved.transport.provider(),
            base_url,
            resolved.transport.header_scheme(),
            credential,
            resolved.transport.error_rules(),
            transport,
        )?;

        debug!(
            "Built {} adapter for model {} using {}",
            resolved.transport.provider(),
            model,
            resolved.mappers.chat.name
        );

        let adapter = Adapter::new(model, client, resolved.mappers.chat);
        Ok(match resolved.mappers.files {
            Some(files) => adapter.with_file_mapper(files),
            None => adapter,
        })
    }

    fn transport(&self) -> GatewayResult<Arc<dyn HttpTransport>> {
        match &self.transport {
            Some(transport) => Ok(Arc::clone(transport)),
            None => Ok(Arc::new(ReqwestTransport::with_config(
                &self.config.connection,
            )?)),
        }
    }

    fn token_manager(&self, build: &BuildConfig, transport: Arc<dyn HttpTransport>) -> TokenManager {
        let credentials = &self.config.credentials;
        let mut state = TokenState {
            access_token: build.access_token.clone(),
            refresh_token: build.refresh_token.clone(),
            expires_at: build.expires_at.as_ref().and_then(parse_expires_at),
            client_id: None,
            client_secret: None,
        };
        state.client_id = build
            .client_id
            .clone()
            .or_else(|| credentials.anthropic_client_id.clone())
            .or_else(|| std::env::var(ANTHROPIC_CLIENT_ID).ok().filter(|v| !v.is_empty()));
        state.client_secret = build
            .client_secret
            .clone()
            .or_else(|| credentials.anthropic_client_secret.clone())
            .or_else(|| crate::config::env::secret_from_env(ANTHROPIC_CLIENT_SECRET));

        let mut builder = TokenManager::builder(state, transport)
            .token_url(self.config.endpoints.oauth_token_url.clone())
            .timeout(self.config.connection.refresh_timeout());
        if let Some(callback) = &self.on_token_refresh {
            let callback = Arc::clone(callback);
            builder = builder.on_token_refresh(move |tokens| callback(tokens));
        }
        builder.build()
    }
}

/// Where a bare model name routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub provider: &'static str,
    pub auth_type: Option<&'static str>,
    pub model: String,
}

struct PrefixRule {
    prefix: &'static str,
    provider: &'static str,
    auth_type: Option<&'static str>,
    strip: bool,
}

const MODEL_PREFIXES: &[PrefixRule] = &[
    PrefixRule { prefix: CLAUDE_CODE_MODEL_PREFIX, provider: "anthropic", auth_type: Some("oauth"), strip: true },
    PrefixRule { prefix: "claude", provider: "anthropic", auth_type: Some("api_key"), strip: false },
    PrefixRule { prefix: "llama", provider: "groq", auth_type: None, strip: false },
    PrefixRule { prefix: "meta-llama/", provider: "groq", auth_type: None, strip: false },
    PrefixRule { prefix: "qwen/", provider: "groq", auth_type: None, strip: false },
    PrefixRule { prefix: "moonshotai/", provider: "groq", auth_type: None, strip: false },
    PrefixRule { prefix: "deepseek-", provider: "groq", auth_type: None, strip: false },
    PrefixRule { prefix: "gpt", provider: "openai", auth_type: None, strip: false },
    PrefixRule { prefix: "o4-", provider: "openai", auth_type: None, strip: false },
    PrefixRule { prefix: "openai", provider: "openai", auth_type: None, strip: false },
];

/// Match a model name against the prefix table; first match wins
pub fn resolve_model(model: &str) -> GatewayResult<ModelRoute> {
    let rule = MODEL_PREFIXES
        .iter()
        .find(|rule| model.starts_with(rule.prefix))
        .ok_or_else(|| GatewayError::UnsupportedModel(model.to_string()))?;

    let model = if rule.strip {
        &model[rule.prefix.len()..]
    } else {
        model
    };
    Ok(ModelRoute {
        provider: rule.provider,
        auth_type: rule.auth_type,
        model: model.to_string(),
    })
}

/// Model-name based entry point
///
/// Credentials come from the builder's configuration first, then from the
/// environment.
#[derive(Debug, Clone)]
pub struct Router {
    builder: GatewayBuilder,
    credentials: CredentialsConfig,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(GatewayBuilder::new())
    }
}

impl Router {
    pub fn new(builder: GatewayBuilder) -> Self {
        let credentials = builder.config().credentials.clone().or(CredentialsConfig::from_env());
        Self {
            builder,
            credentials,
        }
    }

    /// Replace the credential set, skipping the environment
    pub fn with_credentials(mut self, credentials: CredentialsConfig) -> Self {
        self.credentials = credentials;
        self
    }

    /// Build the adapter a model name routes to
    pub fn adapter_for(&self, model: &str) -> GatewayResult<Adapter> {
        let route = resolve_model(model)?;
        let credentials = &self.credentials;

        let mut build = BuildConfig::new(route.provider).with_model(route.model);
        build.auth_type = route.auth_type.map(str::to_string);
        match (route.provider, route.auth_type) {
            ("anthropic", Some("oauth")) => {
                build.access_token = credentials.anthropic_access_token.clone();
                build.refresh_token = credentials.anthropic_refresh_token.clone();
                build.client_id = credentials.anthropic_client_id.clone();
                build.client_secret = credentials.anthropic_client_secret.clone();
            }
            ("anthropic", _) => build.api_key = credentials.anthropic_api_key.clone(),
            ("openai", _) => build.api_key = credentials.openai_api_key.clone(),
            _ => build.api_key = credentials.groq_api_key.clone(),
        }

        self.builder.build(&build)
    }

    pub async fn chat(
        &self,
        model: &str,
        prompt: impl Into<Prompt>,
        options: ChatOptions,
    ) -> GatewayResult<ChatResponse> {
        self.adapter_for(model)?.chat(prompt, options).await
    }
}
