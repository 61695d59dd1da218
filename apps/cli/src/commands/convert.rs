//! `boxcar convert`: raw batch files to per-split record files.

use crate::commands::types::ConvertArgs;
use crate::config::BoxcarConfig;
use anyhow::{Context, Result};
use boxcar_records::{ProgressEvent, ProgressSink, RecordConverter, Split, SplitAssignment, TracingProgressSink};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::time::Duration;

/// Drives a spinner from conversion events.
struct SpinnerProgress {
    spinner: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }
}

impl ProgressSink for SpinnerProgress {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::SplitStarted { split, batches } => {
                self.spinner.set_message(format!("Converting {} ({batches} batches)", split.as_str().cyan()));
            }
            ProgressEvent::BatchFinished { split, batch, records } => {
                self.spinner.set_message(format!("Converting {}: {batch} ({records} records)", split.as_str().cyan()));
            }
            ProgressEvent::SplitFinished { split, records } => {
                self.spinner.println(format!("{} {:<10} {records} records", "✓".green(), split.as_str()));
            }
        }
    }
}

impl Drop for SpinnerProgress {
    fn drop(&mut self) {
        self.spinner.finish_and_clear();
    }
}

pub async fn execute(args: ConvertArgs, config: &BoxcarConfig) -> Result<()> {
    let source = args.source.clone().unwrap_or_else(|| config.dataset.archive.clone());
    let destination = args.output.clone().unwrap_or_else(|| config.dataset.output.clone());
    let assignment = if args.overrides_splits() {
        SplitAssignment { train: args.train.clone(), validation: args.validation.clone(), eval: args.eval.clone() }
    } else {
        config.dataset.splits.clone()
    };

    let progress: Box<dyn ProgressSink> =
        if args.json { Box::new(TracingProgressSink) } else { Box::new(SpinnerProgress::new()) };
    let converter = RecordConverter::new(config.dataset.geometry)
        .with_manifest(!args.no_manifest)
        .with_progress(progress);

    let task_source = source.clone();
    let task_destination = destination.clone();
    let counts = tokio::task::spawn_blocking(move || converter.convert(&task_source, &task_destination, &assignment))
        .await
        .context("Conversion task panicked")?
        .with_context(|| format!("Failed to convert {}", source.display()))?;

    if args.json {
        let out = json!({
            "source": source,
            "output": destination,
            "splits": counts,
            "total": counts.total(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Conversion complete".bold().cyan());
    for split in Split::ALL {
        println!(
            "  {:<10} {:>8}  {}",
            split.as_str(),
            counts.get(split),
            destination.join(split.file_name()).display().to_string().dimmed()
        );
    }
    println!("  {:<10} {:>8}", "total".bold(), counts.total());
    Ok(())
}
