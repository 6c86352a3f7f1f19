//! Routing Demo - One call shape, three providers
//!
//! Sends the same prompt to every model named on the command line, picking
//! the provider from the model name. Credentials come from the environment
//! (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, `GROQ_API_KEY`).
//!
//! Run with: cargo run --example routing_demo -- claude-3-5-haiku-latest gpt-4o-mini llama-3.1-8b-instant

use llm_gateway_core::protocol::ChatOptions;
use llm_gateway_core::Router;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("llm_gateway_core=info")),
        )
        .init();

    let models: Vec<String> = std::env::args().skip(1).collect();
    if models.is_empty() {
        eprintln!("usage: routing_demo <model> [model...]");
        std::process::exit(2);
    }

    let router = Router::default();
    let options = ChatOptions::new().system("Answer in one sentence.");

    for model in &models {
        println!("── {} ──", model);
        match router
            .chat(model, "What is a monad?", options.clone())
            .await
        {
            Ok(response) => {
                println!("{}", response.text());
                println!("usage: {}", response.usage);
            }
            Err(err) => println!("failed ({}): {}", err.kind(), err),
        }
        println!();
    }
}
