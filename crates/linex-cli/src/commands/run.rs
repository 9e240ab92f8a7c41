//! Run command - analyze a stored document end to end.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use linex_core::models::{DocumentEvent, DocumentLocation, LinexConfig};
use linex_core::{
    CancelFlag, InvocationOutcome, InvoicePipeline, JobOrchestrator, Publisher, RowExtractor,
    TextractHttpBackend,
};

use super::{build_sink, load_config};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Storage notification JSON (only the first record is processed)
    #[arg(conflicts_with_all = ["bucket", "key"])]
    event: Option<PathBuf>,

    /// Bucket holding the document
    #[arg(long, requires = "key")]
    bucket: Option<String>,

    /// Object key of the document
    #[arg(long, requires = "bucket")]
    key: Option<String>,

    /// Analysis service endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Queue URL to publish the items to
    #[arg(long)]
    queue_url: Option<String>,

    /// Give up waiting for the job after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Milliseconds between status checks
    #[arg(long)]
    poll_interval: Option<u64>,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, &args);

    let event = match (&args.event, &args.bucket, &args.key) {
        (Some(path), _, _) => DocumentEvent::from_json(&fs::read_to_string(path)?)?,
        (None, Some(bucket), Some(key)) => {
            DocumentEvent::for_location(&DocumentLocation::new(bucket.as_str(), key.as_str()))
        }
        _ => anyhow::bail!("Provide a notification file or both --bucket and --key"),
    };

    let location = event.location()?;
    info!("Analyzing {} via {}", location, config.analysis.endpoint);

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Analyzing {}", location));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result =
        tokio::task::spawn_blocking(move || process_event(&event, &config, cancel)).await?;

    signal_task.abort();
    pb.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => anyhow::bail!("Error processing document: {}", e),
    };

    println!("{}", outcome.response());

    match &outcome {
        InvocationOutcome::Items {
            items, published, ..
        } => {
            let target = if *published { "published" } else { "not published" };
            eprintln!(
                "{} {} items extracted, {}",
                style("✓").green(),
                items.len(),
                target
            );
        }
        InvocationOutcome::NoTable => {
            eprintln!("{} No structured table found", style("ℹ").blue());
        }
        InvocationOutcome::SerializationFailed => {
            anyhow::bail!("Failed to serialize extracted items");
        }
        InvocationOutcome::JobFailed { job_id, .. } => {
            anyhow::bail!("Analysis job {} did not succeed", job_id);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn apply_overrides(config: &mut LinexConfig, args: &RunArgs) {
    if let Some(endpoint) = &args.endpoint {
        config.analysis.endpoint = endpoint.clone();
    }
    if let Some(queue_url) = &args.queue_url {
        config.publisher.queue_url = queue_url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.job.timeout_secs = timeout;
    }
    if let Some(interval) = args.poll_interval {
        config.job.poll_interval_ms = interval;
    }
}

/// Build the HTTP pipeline and process one notification.
///
/// Clients are created and dropped here so they never live on the async runtime.
fn process_event(
    event: &DocumentEvent,
    config: &LinexConfig,
    cancel: CancelFlag,
) -> anyhow::Result<InvocationOutcome> {
    let backend = TextractHttpBackend::new(&config.analysis)?;
    let orchestrator = JobOrchestrator::new(backend, config.job.clone()).with_cancel_flag(cancel);
    let extractor = RowExtractor::from_config(&config.extraction);

    let mut pipeline = InvoicePipeline::new(orchestrator, extractor);
    if let Some(sink) = build_sink(config)? {
        pipeline = pipeline.with_publisher(Publisher::new(sink, config.publisher.queue_url.clone()));
    }

    Ok(pipeline.process(event)?)
}
