//! Files Demo - Upload a local file and read its metadata back
//!
//! Run with: cargo run --example file_roundtrip -- openai ./report.pdf

use llm_gateway_core::config::env::{ANTHROPIC_API_KEY, OPENAI_API_KEY};
use llm_gateway_core::{BuildConfig, GatewayBuilder, GatewayResult};

#[tokio::main]
async fn main() -> GatewayResult<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(provider), Some(path)) = (args.next(), args.next()) else {
        eprintln!("usage: file_roundtrip <anthropic|openai> <path>");
        std::process::exit(2);
    };

    let (key_var, model) = match provider.as_str() {
        "anthropic" => (ANTHROPIC_API_KEY, "claude-sonnet-4-20250514"),
        _ => (OPENAI_API_KEY, "gpt-4o"),
    };
    let key = std::env::var(key_var).unwrap_or_default();

    let adapter = GatewayBuilder::new().build(
        &BuildConfig::new(provider.as_str())
            .with_auth_type("api_key")
            .with_model(model)
            .with_api_key(key),
    )?;

    let content = std::fs::read(&path)
        .map_err(|e| llm_gateway_core::GatewayError::InvalidArgument(e.to_string()))?;
    let filename = std::path::Path::new(&path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin")
        .to_string();

    let uploaded = adapter
        .upload_file(&filename, content, "application/pdf", None)
        .await?;
    println!("uploaded {} ({} bytes) at {}", uploaded.id, uploaded.size_bytes, uploaded.created_at);

    if uploaded.downloadable {
        let file = adapter.download_file(&uploaded.id).await?;
        println!("downloaded {} bytes", file.content.len());
    }
    Ok(())
}
