//! HTTP transport implementation using reqwest

use crate::config::ConnectionConfig;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody};
use crate::providers::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default user agent; providers that need another one set it per request
const USER_AGENT: &str = concat!("llm-gateway/", env!("CARGO_PKG_VERSION"));

/// Shared reqwest client with connection pooling
///
/// Does not retry: timeouts and connection failures are surfaced as-is.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Arc<Client>,
}

impl ReqwestTransport {
    /// Create a transport with default timeouts (10s connect, 480s read)
    pub fn new() -> GatewayResult<Self> {
        Self::with_config(&ConnectionConfig::default())
    }

    /// Create a transport from connection settings
    pub fn with_config(config: &ConnectionConfig) -> GatewayResult<Self> {
        Self::build(config.connect_timeout(), config.read_timeout(), config.pool_max_idle_per_host)
    }

    /// Create a transport with an explicit request timeout
    pub fn with_timeouts(connect_timeout: Duration, request_timeout: Duration) -> GatewayResult<Self> {
        Self::build(connect_timeout, request_timeout, 10)
    }

    fn build(
        connect_timeout: Duration,
        request_timeout: Duration,
        max_idle_per_host: usize,
    ) -> GatewayResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    fn multipart(form: crate::http::MultipartForm) -> GatewayResult<Form> {
        let part = Part::bytes(form.file)
            .file_name(form.filename)
            .mime_str(&form.mime_type)?;
        let mut multipart = Form::new().part("file", part);
        for (name, value) in form.fields {
            multipart = multipart.text(name, value);
        }
        Ok(multipart)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> GatewayResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        debug!("{} {}", request.method.as_str(), request.url);

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Form(body) => builder.body(body),
            RequestBody::Multipart(form) => builder.multipart(Self::multipart(form)?),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Request timeout for {}", request.url);
            } else {
                error!("Request error for {}: {}", request.url, e);
            }
            GatewayError::from(e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();
        debug!("Response status: {} ({} bytes)", status, body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MultipartForm;

    #[test]
    fn test_builds_from_default_config() {
        assert!(ReqwestTransport::new().is_ok());
        assert!(ReqwestTransport::with_timeouts(Duration::from_secs(1), Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_multipart_rejects_bad_mime_type() {
        let form = MultipartForm {
            file: b"abc".to_vec(),
            filename: "a.txt".to_string(),
            mime_type: "not a mime".to_string(),
            fields: Vec::new(),
        };
        assert!(ReqwestTransport::multipart(form).is_err());
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        let transport = ReqwestTransport::with_timeouts(Duration::from_secs(2), Duration::from_secs(5)).unwrap();
        let err = transport
            .send(HttpRequest {
                method: Method::Get,
                url: "http://127.0.0.1:1/".to_string(),
                headers: Vec::new(),
                body: RequestBody::Empty,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::providers::error::ErrorKind::Connection);
    }
}
