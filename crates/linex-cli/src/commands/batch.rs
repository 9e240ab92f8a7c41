//! Batch processing command for multiple saved analysis results.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use linex_core::InvocationOutcome;
use linex_core::models::{InvoiceItem, LinexConfig};

use super::extract::{OutputFormat, extract_file, format_items, sum_totals};
use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Publish each file's items to the configured queue
    #[arg(long)]
    publish: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    status: FileStatus,
    processing_time_ms: u64,
}

enum FileStatus {
    Items(Vec<InvoiceItem>),
    NoTable,
    Failed(String),
}

impl FileStatus {
    fn label(&self) -> &'static str {
        match self {
            FileStatus::Items(_) => "success",
            FileStatus::NoTable => "no_table",
            FileStatus::Failed(_) => "error",
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if !args.publish {
        config.publisher.queue_url.clear();
    } else if config.publisher.queue_url.is_empty() {
        anyhow::bail!("--publish requires publisher.queue_url in the configuration");
    }

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let continue_on_error = args.continue_on_error;
    let results = tokio::task::spawn_blocking(move || {
        process_files(files, &config, continue_on_error, &pb)
    })
    .await??;

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            if let FileStatus::Items(items) = &result.status {
                write_file_output(output_dir, &result.path, items, args.format)?;
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let count = |label: &str| results.iter().filter(|r| r.status.label() == label).count();
    let item_count: usize = results
        .iter()
        .map(|r| match &r.status {
            FileStatus::Items(items) => items.len(),
            _ => 0,
        })
        .sum();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful ({} items), {} without table, {} failed",
        style(count("success")).green(),
        item_count,
        style(count("no_table")).yellow(),
        style(count("error")).red()
    );

    let failed: Vec<_> = results
        .iter()
        .filter_map(|r| match &r.status {
            FileStatus::Failed(e) => Some((&r.path, e)),
            _ => None,
        })
        .collect();

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for (path, error) in failed {
            eprintln!("  - {}: {}", path.display(), error);
        }
    }

    Ok(())
}

fn process_files(
    files: Vec<PathBuf>,
    config: &LinexConfig,
    continue_on_error: bool,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<FileResult>> {
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let status = match extract_file(&path, config) {
            Ok(InvocationOutcome::Items { items, .. }) => FileStatus::Items(items),
            Ok(InvocationOutcome::NoTable) => FileStatus::NoTable,
            Ok(outcome) => FileStatus::Failed(outcome.response()),
            Err(e) => FileStatus::Failed(e.to_string()),
        };

        if let FileStatus::Failed(error_msg) = &status {
            if continue_on_error {
                warn!("Failed to process {}: {}", path.display(), error_msg);
            } else {
                error!("Failed to process {}: {}", path.display(), error_msg);
                pb.abandon();
                anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
            }
        }

        results.push(FileResult {
            path,
            status,
            processing_time_ms: file_start.elapsed().as_millis() as u64,
        });
        pb.inc(1);
    }

    pb.finish_with_message("Complete");
    Ok(results)
}

fn write_file_output(
    output_dir: &Path,
    path: &Path,
    items: &[InvoiceItem],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let output_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("items");

    let output_path = output_dir.join(format!("{}.{}", output_name, format.extension()));

    fs::write(&output_path, format_items(items, format)?)?;
    debug!("Wrote output to {}", output_path.display());

    Ok(())
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "items",
        "total_sum",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let (items, total_sum, error) = match &result.status {
            FileStatus::Items(items) => match sum_totals(items) {
                Some(sum) => (items.len().to_string(), sum.to_string(), ""),
                None => (items.len().to_string(), String::new(), "sum of line totals overflows"),
            },
            FileStatus::NoTable => ("0".to_string(), String::new(), ""),
            FileStatus::Failed(e) => (String::new(), String::new(), e.as_str()),
        };

        wtr.write_record([
            filename,
            result.status.label(),
            &items,
            &total_sum,
            &result.processing_time_ms.to_string(),
            error,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
