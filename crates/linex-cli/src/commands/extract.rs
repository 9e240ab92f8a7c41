//! Extract command - read line items from a saved analysis result.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use linex_core::models::{DocumentLocation, InvoiceItem, LinexConfig};
use linex_core::publish::serialize_items;
use linex_core::{EMPTY_PAYLOAD, InvocationOutcome, InvoicePipeline, RecordedBackend};

use super::{build_sink, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Saved analysis result (response page, array of pages, or block array)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Publish the items to this queue URL
    #[arg(long)]
    queue_url: Option<String>,

    /// Check quantity times unit price against each line total
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array, as published
    Json,
    /// CSV with one row per item
    Csv,
    /// Plain text table
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(queue_url) = &args.queue_url {
        config.publisher.queue_url = queue_url.clone();
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting line items from {}", args.input.display());

    let input = args.input.clone();
    let outcome = tokio::task::spawn_blocking(move || extract_file(&input, &config)).await??;

    match &outcome {
        InvocationOutcome::Items {
            items, published, ..
        } => {
            let output = format_items(items, args.format)?;
            write_output(&output, args.output.as_deref())?;

            if *published {
                eprintln!(
                    "{} Published {} items",
                    style("✓").green(),
                    items.len()
                );
            }

            if args.validate {
                report_inconsistencies(items);
            }
        }
        InvocationOutcome::NoTable => {
            eprintln!(
                "{} No structured table found in {}",
                style("ℹ").blue(),
                args.input.display()
            );
            if let OutputFormat::Json = args.format {
                write_output(EMPTY_PAYLOAD, args.output.as_deref())?;
            }
        }
        InvocationOutcome::SerializationFailed | InvocationOutcome::JobFailed { .. } => {
            anyhow::bail!("{}", outcome.response());
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Run the pipeline over a saved analysis file.
///
/// Must run on a blocking thread: the queue sink uses a blocking HTTP client.
pub fn extract_file(path: &Path, config: &LinexConfig) -> anyhow::Result<InvocationOutcome> {
    let mut config = config.clone();
    config.job.poll_interval_ms = 0;

    let backend = RecordedBackend::from_file(path)?;
    let pipeline = InvoicePipeline::from_config(backend, build_sink(&config)?, &config);
    let location = DocumentLocation::new("local", path.display().to_string());

    Ok(pipeline.process_location(&location)?)
}

fn write_output(output: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output)?;
            eprintln!("{} Output written to {}", style("✓").green(), path.display());
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn report_inconsistencies(items: &[InvoiceItem]) {
    let inconsistent: Vec<_> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_consistent())
        .collect();

    if inconsistent.is_empty() {
        return;
    }

    eprintln!("{}", style("Validation issues:").yellow());
    for (i, item) in inconsistent {
        eprintln!(
            "  - item {} ({}): {} x {} != {}",
            i + 1,
            item.code.as_deref().unwrap_or("?"),
            item.quantity,
            item.unit_price,
            item.total
        );
    }
}

pub fn format_items(items: &[InvoiceItem], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serialize_items(items)?),
        OutputFormat::Csv => format_csv(items),
        OutputFormat::Text => format_text(items),
    }
}

fn format_csv(items: &[InvoiceItem]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["code", "description", "quantity", "unit_price", "total"])?;

    for item in items {
        wtr.write_record([
            item.code.as_deref().unwrap_or(""),
            item.description.as_deref().unwrap_or(""),
            &item.quantity.to_string(),
            &item.unit_price.to_string(),
            &item.total.to_string(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

/// Sum of the line totals, or `None` if it overflows.
pub fn sum_totals(items: &[InvoiceItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total))
}

fn format_text(items: &[InvoiceItem]) -> anyhow::Result<String> {
    let mut output = String::new();

    output.push_str(&format!("Line items: {}\n\n", items.len()));
    output.push_str(&format!(
        "{:>3}  {:<12} {:<32} {:>8} {:>12} {:>12}\n",
        "#", "Code", "Description", "Qty", "Unit price", "Total"
    ));

    for (i, item) in items.iter().enumerate() {
        output.push_str(&format!(
            "{:>3}  {:<12} {:<32} {:>8} {:>12} {:>12}\n",
            i + 1,
            item.code.as_deref().unwrap_or("-"),
            item.description.as_deref().unwrap_or("-"),
            item.quantity,
            item.unit_price.to_string(),
            item.total.to_string()
        ));
    }

    let sum = sum_totals(items)
        .ok_or_else(|| anyhow::anyhow!("Sum of line totals overflows"))?;
    output.push_str(&format!("\nTotal: {}\n", sum));

    Ok(output)
}
