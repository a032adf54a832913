use speakmate_client::events::{Event, FnEventHandler};
use speakmate_client::{AnalyzeOptions, AnalyzeRequest, AnalyzeSession};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("speakmate_client=debug")),
        )
        .init();

    let session = AnalyzeSession::builder()
        .event_handler(Arc::new(FnEventHandler(|event: Event| {
            if let Event::StateChanged(state) = event {
                println!(
                    "  state: loading={} error={} data={}",
                    state.loading,
                    state.error.is_some(),
                    state.data.is_some()
                );
            }
        })))
        .build();

    let request = AnalyzeRequest::new("demo/transcript.json").with_language("en");
    let options = AnalyzeOptions::new().with_dry_run(true);

    println!("Running dry-run analysis...");
    let report = session
        .analyze(&request, Some(options))
        .await
        .ok_or_else(|| anyhow::anyhow!("dry run produced no report"))?;

    println!("\nScores:");
    for (key, score) in report.scores.iter() {
        println!("  {:<18} {}", key.as_str(), score);
    }
    println!("Feedback: {}", report.feedback.vocabulary);
    println!("Actions:");
    for action in &report.feedback.actions {
        println!("  - {}", action);
    }
    println!("Transcript key: {}", report.assets.transcript_key);

    Ok(())
}
