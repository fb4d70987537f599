use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lantern_client::{Lantern, TraceBody};
use lantern_media::{MediaReference, MediaSource};
use serde_json::json;

// 1x1 transparent PNG
const ONE_PX_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    // Set RUST_LOG env var to control log level, e.g.:
    // RUST_LOG=debug cargo run --example media_usage
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Connecting to Lantern...");
    let client = Lantern::from_env()?;

    // The inline image is swapped for a reference token before the event
    // is queued; the bytes upload in the background
    let data_uri = format!("data:image/png;base64,{ONE_PX_PNG}");
    println!("Recording a trace with an inline image...");
    let trace = client.trace(
        TraceBody::new("vision").with_input(json!({
            "question": "what is in this image?",
            "image": data_uri,
        })),
    );
    println!("Trace URL: {}", trace.url());

    println!("Flushing uploads and events...");
    client.flush().await;

    // Reference ids derive from the content, so the token can be rebuilt
    // from the same bytes and resolved back to the original data URI
    let bytes = STANDARD.decode(ONE_PX_PNG)?;
    let reference = MediaReference::from_bytes(&bytes, "image/png", MediaSource::Base64DataUri);
    println!("Reference token: {}", reference.token());

    let resolved = client.resolve_media(&json!({"image": reference.token()})).await;
    let round_tripped = resolved["image"] == json!(data_uri);
    println!("Round trip matches original: {round_tripped}");

    client.shutdown().await;
    println!("Done!");

    Ok(())
}
