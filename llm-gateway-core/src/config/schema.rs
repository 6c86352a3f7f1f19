//! Gateway configuration schema

use super::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const ANTHROPIC_OAUTH_TOKEN_URL: &str = "https://api.anthropic.com/v1/oauth/token";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Credentials used by the model-name router before falling back to the environment
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Connection settings shared by every provider client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Time allowed to establish a connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Time allowed for the whole response; chat completions can be slow
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Timeout for the OAuth token refresh call
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,

    #[serde(default = "default_max_idle")]
    pub pool_max_idle_per_host: usize,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    480
}

fn default_refresh_timeout() -> u64 {
    30
}

fn default_max_idle() -> usize {
    10
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
            pool_max_idle_per_host: default_max_idle(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// Provider base URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_anthropic")]
    pub anthropic: String,
    #[serde(default = "default_openai")]
    pub openai: String,
    #[serde(default = "default_groq")]
    pub groq: String,
    #[serde(default = "default_oauth_token_url")]
    pub oauth_token_url: String,
}

fn default_anthropic() -> String {
    ANTHROPIC_BASE_URL.to_string()
}

fn default_openai() -> String {
    OPENAI_BASE_URL.to_string()
}

fn default_groq() -> String {
    GROQ_BASE_URL.to_string()
}

fn default_oauth_token_url() -> String {
    ANTHROPIC_OAUTH_TOKEN_URL.to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            anthropic: default_anthropic(),
            openai: default_openai(),
            groq: default_groq(),
            oauth_token_url: default_oauth_token_url(),
        }
    }
}

/// Optional provider credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groq_api_key: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_access_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_refresh_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_client_secret: Option<SecretString>,
}
