//! Environment variable interpolation and credential lookup

use super::error::ConfigError;
use super::schema::CredentialsConfig;
use super::secrets::SecretString;
use regex::{Captures, Regex};
use std::env;

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const ANTHROPIC_ACCESS_TOKEN: &str = "ANTHROPIC_ACCESS_TOKEN";
pub const ANTHROPIC_REFRESH_TOKEN: &str = "ANTHROPIC_REFRESH_TOKEN";
pub const ANTHROPIC_CLIENT_ID: &str = "ANTHROPIC_CLIENT_ID";
pub const ANTHROPIC_CLIENT_SECRET: &str = "ANTHROPIC_CLIENT_SECRET";

const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Replace every `${VAR}` in `content` with the value of `VAR`
///
/// Fails on the first variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let pattern = Regex::new(ENV_VAR_PATTERN).map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })?;

    let mut missing = None;
    let result = pattern.replace_all(content, |cap: &Captures| match env::var(&cap[1]) {
        Ok(value) => value,
        Err(_) => {
            missing.get_or_insert_with(|| cap[1].to_string());
            String::new()
        }
    });

    match missing {
        Some(var) => Err(ConfigError::EnvVarNotFound { var }),
        None => Ok(result.into_owned()),
    }
}

/// Read a non-empty variable as a secret
pub fn secret_from_env(name: &str) -> Option<SecretString> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::new)
}

impl CredentialsConfig {
    /// Credentials from the conventional provider environment variables
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: secret_from_env(ANTHROPIC_API_KEY),
            openai_api_key: secret_from_env(OPENAI_API_KEY),
            groq_api_key: secret_from_env(GROQ_API_KEY),
            anthropic_access_token: secret_from_env(ANTHROPIC_ACCESS_TOKEN),
            anthropic_refresh_token: secret_from_env(ANTHROPIC_REFRESH_TOKEN),
            anthropic_client_id: env::var(ANTHROPIC_CLIENT_ID).ok().filter(|v| !v.is_empty()),
            anthropic_client_secret: secret_from_env(ANTHROPIC_CLIENT_SECRET),
        }
    }

    /// Fill unset fields from `other`
    pub fn or(self, other: CredentialsConfig) -> Self {
        Self {
            anthropic_api_key: self.anthropic_api_key.or(other.anthropic_api_key),
            openai_api_key: self.openai_api_key.or(other.openai_api_key),
            groq_api_key: self.groq_api_key.or(other.groq_api_key),
            anthropic_access_token: self.anthropic_access_token.or(other.anthropic_access_token),
            anthropic_refresh_token: self.anthropic_refresh_token.or(other.anthropic_refresh_token),
            anthropic_client_id: self.anthropic_client_id.or(other.anthropic_client_id),
            anthropic_client_secret: self.anthropic_client_secret.or(other.anthropic_client_secret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars() {
        env::set_var("GATEWAY_TEST_VAR", "test_value");

        let result = interpolate_env_vars("api_key: ${GATEWAY_TEST_VAR}").unwrap();
        assert_eq!(result, "api_key: test_value");

        env::remove_var("GATEWAY_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let result = interpolate_env_vars("api_key: ${GATEWAY_MISSING_VAR}");
        match result {
            Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "GATEWAY_MISSING_VAR"),
            other => panic!("Expected EnvVarNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_var_is_replaced_everywhere() {
        env::set_var("GATEWAY_REPEAT", "x");
        let result = interpolate_env_vars("${GATEWAY_REPEAT}-${GATEWAY_REPEAT}").unwrap();
        assert_eq!(result, "x-x");
        env::remove_var("GATEWAY_REPEAT");
    }

    #[test]
    fn test_credentials_fallback() {
        let configured = CredentialsConfig {
            openai_api_key: Some(SecretString::new("from-config")),
            ..Default::default()
        };
        let env_like = CredentialsConfig {
            openai_api_key: Some(SecretString::new("from-env")),
            groq_api_key: Some(SecretString::new("groq-env")),
            ..Default::default()
        };

        let merged = configured.or(env_like);
        assert_eq!(merged.openai_api_key.unwrap().expose_secret(), "from-config");
        assert_eq!(merged.groq_api_key.unwrap().expose_secret(), "groq-env");
    }
}
