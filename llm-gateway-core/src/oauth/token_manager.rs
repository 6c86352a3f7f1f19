//! OAuth access token lifecycle
//!
//! The manager owns the only mutable state in the gateway. Refreshes are
//! serialized behind a mutex and run on their own task, so dropping a chat
//! future never abandons a half-written token rotation.

use crate::config::{SecretString, ANTHROPIC_OAUTH_TOKEN_URL};
use crate::http::{HttpRequest, HttpTransport, Method, RequestBody};
use crate::providers::error::{GatewayError, GatewayResult};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Epoch values above this are taken to be milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Credentials after a successful refresh
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedTokens {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Invoked after every successful refresh so callers can persist rotated tokens
pub type RefreshCallback = Arc<dyn Fn(&RefreshedTokens) + Send + Sync>;

/// OAuth credentials and expiry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenState {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

impl TokenState {
    pub fn new(refresh_token: impl Into<SecretString>) -> Self {
        Self {
            refresh_token: Some(refresh_token.into()),
            ..Default::default()
        }
    }

    pub fn with_access_token(mut self, token: impl Into<SecretString>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Expired at `now`; an unknown expiry counts as expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }
}

/// Parse an expiry given as RFC 3339 text, epoch seconds, or epoch milliseconds
pub fn parse_expires_at(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_expiry_text(text),
        Value::Number(number) => number.as_i64().and_then(from_epoch),
        _ => None,
    }
}

fn parse_expiry_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(epoch) = text.trim().parse::<i64>() {
        return from_epoch(epoch);
    }
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch.abs() > MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(epoch).single()
    } else {
        Utc.timestamp_opt(epoch, 0).single()
    }
}

/// Builder for [`TokenManager`]
pub struct TokenManagerBuilder {
    state: TokenState,
    transport: Arc<dyn HttpTransport>,
    token_url: String,
    timeout: Duration,
    on_refresh: Option<RefreshCallback>,
}

impl TokenManagerBuilder {
    /// Override the token endpoint
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Timeout for the refresh call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register the callback run after each successful refresh
    pub fn on_token_refresh<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RefreshedTokens) + Send + Sync + 'static,
    {
        self.on_refresh = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> TokenManager {
        TokenManager {
            inner: Arc::new(Inner {
                state: Mutex::new(self.state),
                transport: self.transport,
                token_url: self.token_url,
                timeout: self.timeout,
                on_refresh: self.on_refresh,
            }),
        }
    }
}

struct Inner {
    state: Mutex<TokenState>,
    transport: Arc<dyn HttpTransport>,
    token_url: String,
    timeout: Duration,
    on_refresh: Option<RefreshCallback>,
}

/// Owns access and refresh tokens for an OAuth-authenticated provider
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.inner.token_url)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn builder(state: TokenState, transport: Arc<dyn HttpTransport>) -> TokenManagerBuilder {
        TokenManagerBuilder {
            state,
            transport,
            token_url: ANTHROPIC_OAUTH_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(30),
            on_refresh: None,
        }
    }

    pub fn new(state: TokenState, transport: Arc<dyn HttpTransport>) -> Self {
        Self::builder(state, transport).build()
    }

    /// Current access token, if any
    pub async fn access_token(&self) -> Option<SecretString> {
        self.inner.state.lock().await.access_token.clone()
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> TokenState {
        self.inner.state.lock().await.clone()
    }

    pub async fn is_expired(&self) -> bool {
        self.inner.state.lock().await.is_expired_at(Utc::now())
    }

    /// Refresh if the token is expired or its expiry is unknown
    ///
    /// Concurrent callers observing the same expired token trigger one refresh.
    pub async fn ensure_valid(&self) -> GatewayResult<()> {
        if !self.is_expired().await {
            return Ok(());
        }
        self.spawn_refresh(true).await
    }

    /// Refresh unconditionally
    pub async fn refresh(&self) -> GatewayResult<()> {
        self.spawn_refresh(false).await
    }

    async fn spawn_refresh(&self, only_if_expired: bool) -> GatewayResult<()> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut state = inner.state.lock().await;
            if only_if_expired && !state.is_expired_at(Utc::now()) {
                debug!("Token already refreshed by a concurrent caller");
                return Ok(());
            }
            inner.refresh_locked(&mut state).await
        });

        task.await.map_err(|e| {
            GatewayError::authentication(format!("Token refresh task failed: {}", e), None)
        })?
    }
}

impl Inner {
    async fn refresh_locked(&self, state: &mut TokenState) -> GatewayResult<()> {
        let refresh_token = state.refresh_token.clone().ok_or_else(|| {
            GatewayError::Configuration("Cannot refresh token: refresh_token not provided".into())
        })?;
        let client_id = state.client_id.clone().ok_or_else(|| {
            GatewayError::Configuration("Cannot refresh token: client_id not provided".into())
        })?;
        let client_secret = state.client_secret.clone().ok_or_else(|| {
            GatewayError::Configuration("Cannot refresh token: client_secret not provided".into())
        })?;

        let form = serde_urlencoded::to_string([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.expose_secret()),
        ])
        .map_err(|e| GatewayError::InvalidArgument(format!("Failed to encode refresh form: {}", e)))?;

        let request = HttpRequest {
            method: Method::Post,
            url: self.token_url.clone(),
            headers: vec![
                (
                    "content-type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body: RequestBody::Form(form),
        };

        info!("Refreshing OAuth access token");
        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| {
                GatewayError::Timeout(format!(
                    "Token refresh exceeded {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if response.status != 200 {
            warn!("Token refresh failed with status {}", response.status);
            return Err(refresh_failure(&response.body));
        }

        let data: Value = serde_json::from_slice(&response.body)?;
        let access_token = data
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("Token response has no access_token".into())
            })?;

        state.access_token = Some(SecretString::new(access_token));
        if let Some(rotated) = data.get("refresh_token").and_then(Value::as_str) {
            state.refresh_token = Some(SecretString::new(rotated));
        }
        if let Some(expires_in) = data.get("expires_in").and_then(expires_in_secs) {
            state.expires_at = Some(Utc::now() + ChronoDuration::seconds(expires_in));
        } else if let Some(expires_at) = data.get("expires_at").and_then(parse_expires_at) {
            state.expires_at = Some(expires_at);
        }
        debug!("Access token refreshed, expires at {:?}", state.expires_at);

        if let Some(callback) = &self.on_refresh {
            let tokens = RefreshedTokens {
                access_token: SecretString::new(access_token),
                refresh_token: state.refresh_token.clone().unwrap_or(refresh_token),
                expires_at: state.expires_at,
            };
            callback(&tokens);
        }

        Ok(())
    }
}

fn expires_in_secs(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn refresh_failure(body: &[u8]) -> GatewayError {
    let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let reason = match parsed.get("error") {
        Some(Value::String(error)) => error.clone(),
        Some(Value::Object(error)) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(error.clone()).to_string()),
        _ => String::from_utf8_lossy(body).into_owned(),
    };
    let code = parsed
        .get("error_code")
        .and_then(Value::as_str)
        .map(str::to_string);
    GatewayError::authentication(format!("Failed to refresh token: {}", reason), code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_expiry_is_expired() {
        let state = TokenState::new("refresh");
        assert!(state.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_future_expiry_is_valid() {
        let state = TokenState::new("refresh")
            .with_expires_at(Some(Utc::now() + ChronoDuration::hours(1)));
        assert!(!state.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let state = TokenState::new("refresh").with_expires_at(Some(now));
        assert!(state.is_expired_at(now));
    }

    #[test]
    fn test_parse_expires_at_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 8, 8, 6, 3, 16).unwrap();
        assert_eq!(parse_expires_at(&json!(1754632996)), Some(expected));
        assert_eq!(parse_expires_at(&json!(1754632996000_i64)), Some(expected));
        assert_eq!(parse_expires_at(&json!("2025-08-08T06:03:16Z")), Some(expected));
        assert_eq!(parse_expires_at(&json!("1754632996000")), Some(expected));
        assert_eq!(parse_expires_at(&json!("tomorrow")), None);
        assert_eq!(parse_expires_at(&Value::Null), None);
    }

    #[test]
    fn test_refresh_failure_message() {
        let err = refresh_failure(br#"{"error":"invalid_grant","error_code":"E42"}"#);
        assert_eq!(err.message(), "Failed to refresh token: invalid_grant");
        assert_eq!(err.code(), Some("E42"));

        let err = refresh_failure(b"gateway down");
        assert_eq!(err.message(), "Failed to refresh token: gateway down");
    }
}
