use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vertex_gemini_chat::{init_chat_adapter, Message, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vertex_gemini_chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("Failed to load settings")?;
    info!(
        "Configuration loaded: project={:?} location={} model={}",
        settings.connection.project_id, settings.connection.location, settings.connection.model
    );

    let adapter = init_chat_adapter(&settings)
        .await
        .context("Failed to initialize chat adapter")?;

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let prompt = if prompt.trim().is_empty() {
        "Hello".to_string()
    } else {
        prompt
    };

    let result = adapter
        .generate(&[Message::user(prompt)])
        .await
        .context("Generation failed")?;

    println!("{}", result.text);
    println!(
        "\nfinish reason: {} | prompt tokens: {} | generation tokens: {}",
        result.finish_reason, result.prompt_tokens, result.generation_tokens
    );

    Ok(())
}
