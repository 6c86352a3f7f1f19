//! Configuration validation

use super::error::ValidationError;
use super::schema::GatewayConfig;
use url::Url;

/// Checks a loaded configuration before it is used to build clients
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        self.validate_timeouts(config)?;
        self.validate_endpoints(config)?;
        Ok(())
    }

    fn validate_timeouts(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        let connection = &config.connection;
        let timeouts = [
            ("connection.connect_timeout_secs", connection.connect_timeout_secs),
            ("connection.read_timeout_secs", connection.read_timeout_secs),
            ("connection.refresh_timeout_secs", connection.refresh_timeout_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ValidationError::out_of_range(field, "timeout must be positive"));
            }
        }
        if connection.connect_timeout_secs > connection.read_timeout_secs {
            return Err(ValidationError::out_of_range(
                "connection.connect_timeout_secs",
                "connect timeout cannot exceed read timeout",
            ));
        }
        Ok(())
    }

    fn validate_endpoints(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        let endpoints = &config.endpoints;
        let urls = [
            ("endpoints.anthropic", &endpoints.anthropic),
            ("endpoints.openai", &endpoints.openai),
            ("endpoints.groq", &endpoints.groq),
            ("endpoints.oauth_token_url", &endpoints.oauth_token_url),
        ];
        for (field, value) in urls {
            validate_http_url(field, value)?;
        }
        Ok(())
    }
}

/// Ensure `value` is an absolute http(s) URL
pub fn validate_http_url(field: &str, value: &str) -> Result<(), ValidationError> {
    let url = Url::parse(value).map_err(|e| ValidationError::invalid_url(field, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ValidationError::invalid_url(
            field,
            format!("unsupported scheme '{}'", scheme),
        )),
    }
}
