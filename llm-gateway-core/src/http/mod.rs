//! HTTP layer for talking to LLM providers
//!
//! This module implements the transport side of the gateway, handling:
//! - The pluggable `send` primitive ([`HttpTransport`]) and its reqwest implementation
//! - Provider request building and response decoding ([`api_client::ApiClient`])
//! - Classification of non-2xx responses into the error taxonomy

pub mod api_client;
pub mod client;
pub mod error;

use crate::providers::error::GatewayResult;
use async_trait::async_trait;

pub use api_client::{ApiBody, ApiClient, Credential, HeaderScheme};
pub use client::ReqwestTransport;

/// HTTP method used by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Multipart upload with a single `file` part
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartForm {
    pub file: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    /// Additional text fields, sent in order after the file part
    pub fields: Vec<(String, String)>,
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Serialized JSON document
    Json(Vec<u8>),
    /// `application/x-www-form-urlencoded` body
    Form(String),
    Multipart(MultipartForm),
}

/// A fully built request, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Status, headers and body as returned by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body is declared as JSON
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|value| value.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Send one request and return the raw response
///
/// Non-2xx statuses are returned as responses, not errors. Implementations
/// only fail for transport problems (timeouts, refused connections).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> GatewayResult<HttpResponse>;
}
