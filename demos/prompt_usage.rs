use lantern_client::{GetPromptOptions, Lantern, PromptContent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    // Set RUST_LOG env var to control log level, e.g.:
    // RUST_LOG=debug cargo run --example prompt_usage
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Connecting to Lantern...");
    let client = Lantern::from_env()?;

    // The fallback keeps the application working when the platform is
    // unreachable and nothing usable is cached yet
    println!("Fetching prompt 'assistant-system'...");
    let prompt = client
        .get_prompt(
            "assistant-system",
            GetPromptOptions {
                label: Some("production".to_string()),
                fallback: Some(PromptContent::Text(
                    "You are a helpful assistant.".to_string(),
                )),
                ..Default::default()
            },
        )
        .await?;

    if prompt.is_fallback {
        println!("Platform unreachable, using the fallback prompt");
    } else {
        println!("Got version {} (labels: {:?})", prompt.version, prompt.labels);
    }
    match &prompt.prompt {
        PromptContent::Text(text) => println!("Prompt text: {text}"),
        PromptContent::Chat(messages) => {
            for message in messages {
                println!("[{}] {}", message.role, message.content);
            }
        }
    }

    // A second get for the same prompt is served from the cache
    println!("Fetching again (cached)...");
    let cached = client
        .get_prompt(
            "assistant-system",
            GetPromptOptions {
                label: Some("production".to_string()),
                ..Default::default()
            },
        )
        .await?;
    println!("Cached version: {}", cached.version);

    client.shutdown().await;
    println!("Done!");

    Ok(())
}
