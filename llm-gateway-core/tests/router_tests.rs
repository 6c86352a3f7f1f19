//! Model-name routing end to end

use llm_gateway_core::config::{CredentialsConfig, EndpointConfig, GatewayConfig, SecretString};
use llm_gateway_core::http::ReqwestTransport;
use llm_gateway_core::protocol::ChatOptions;
use llm_gateway_core::providers::{resolve_model, ModelRoute};
use llm_gateway_core::{ErrorKind, GatewayBuilder, Router};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router_for(server: &MockServer) -> Router {
    let config = GatewayConfig {
        endpoints: EndpointConfig {
            anthropic: format!("{}/anthropic", server.uri()),
            openai: format!("{}/openai", server.uri()),
            groq: format!("{}/groq", server.uri()),
            ..EndpointConfig::default()
        },
        ..GatewayConfig::default()
    };
    let builder = GatewayBuilder::new()
        .with_config(config)
        .with_transport(Arc::new(ReqwestTransport::new().expect("transport")));

    Router::new(builder).with_credentials(CredentialsConfig {
        anthropic_api_key: Some(SecretString::new("sk-ant")),
        openai_api_key: Some(SecretString::new("sk-openai")),
        groq_api_key: Some(SecretString::new("gsk")),
        ..CredentialsConfig::default()
    })
}

fn chat_completion(model: &str) -> serde_json::Value {
    json!({
        "id": "x",
        "model": model,
        "usage": {},
        "choices": [{"finish_reason": "stop", "message": {"role": "assistant", "content": "pong"}}]
    })
}

#[tokio::test]
async fn test_routes_by_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anthropic/messages"))
        .and(header("x-api-key", "sk-ant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m", "model": "claude-3-5-haiku", "stop_reason": "end_turn", "usage": {},
            "content": [{"type": "text", "text": "pong"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .and(header("authorization", "Bearer sk-openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("gpt-4o-mini")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/groq/chat/completions"))
        .and(header("authorization", "Bearer gsk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("llama-3.1-8b-instant")))
        .expect(1)
        .mount(&server)
        .await;

    let router = router_for(&server);
    for model in ["claude-3-5-haiku", "gpt-4o-mini", "llama-3.1-8b-instant"] {
        let response = router.chat(model, "ping", ChatOptions::new()).await.unwrap();
        assert_eq!(response.text(), "pong", "model {model}");
    }
}

#[tokio::test]
async fn test_unknown_model_never_reaches_the_network() {
    let server = MockServer::start().await;
    let router = router_for(&server);

    let err = router
        .chat("mistral-large-latest", "ping", ChatOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedModel);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[test]
fn test_claude_code_prefix_selects_oauth() {
    assert_eq!(
        resolve_model("claude_code/claude-opus-4").unwrap(),
        ModelRoute {
            provider: "anthropic",
            auth_type: Some("oauth"),
            model: "claude-opus-4".to_string(),
        }
    );
}

#[test]
fn test_vendor_prefixed_models_route_to_groq() {
    for model in ["meta-llama/llama-4-scout-17b-16e-instruct", "moonshotai/kimi-k2-instruct", "deepseek-r1-distill-llama-70b"] {
        assert_eq!(resolve_model(model).unwrap().provider, "groq");
    }
}

#[test]
fn test_empty_model_is_unsupported() {
    let err = tokio_test::assert_err!(resolve_model(""));
    assert_eq!(err.kind(), ErrorKind::UnsupportedModel);
}

#[test]
fn test_adapter_for_performs_no_io() {
    // Building an adapter is synchronous and performs no I/O
    let router = Router::new(GatewayBuilder::new()).with_credentials(CredentialsConfig {
        openai_api_key: Some(SecretString::new("sk")),
        ..CredentialsConfig::default()
    });
    let adapter = tokio_test::assert_ok!(router.adapter_for("o4-mini"));
    assert_eq!(adapter.model(), "o4-mini");
    assert!(adapter.supports_files());
}
