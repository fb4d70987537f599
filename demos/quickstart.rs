use lantern_client::{GenerationUsage, Lantern, ObservationBody, ScoreBody, TraceBody};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    // Set RUST_LOG env var to control log level, e.g.:
    // RUST_LOG=debug cargo run --example quickstart
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Reads LANTERN_HOST, LANTERN_PUBLIC_KEY and LANTERN_SECRET_KEY
    println!("Connecting to Lantern...");
    let client = Lantern::from_env()?;

    println!("Recording a trace...");
    let trace = client.trace(
        TraceBody::new("quickstart")
            .with_user_id("user123")
            .with_input(json!({"question": "What is Lantern?"})),
    );

    let generation = trace.generation(
        ObservationBody::new("answer")
            .with_model("gpt-4o")
            .with_input(json!([{"role": "user", "content": "What is Lantern?"}])),
    );
    generation.end_with(
        ObservationBody::default()
            .with_output(json!(
                "Lantern is an observability platform for LLM applications."
            ))
            .with_usage(GenerationUsage {
                input: Some(9),
                output: Some(12),
                total: Some(21),
                unit: Some("TOKENS".to_string()),
            }),
    );

    trace.score(ScoreBody::numeric("quality", 0.95).with_comment("demo score"));
    trace.update(TraceBody::default().with_output(json!("answered")));

    println!("Trace URL: {}", trace.url());

    // Deliver everything buffered before the process exits
    println!("Shutting down...");
    client.shutdown().await;

    let stats = client.stats();
    println!(
        "Delivered {} events ({} dropped, {} failed)",
        stats.delivered, stats.dropped, stats.failed
    );
    println!("Done!");

    Ok(())
}
