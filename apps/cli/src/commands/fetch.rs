//! `boxcar fetch`: download the dataset archive.

use crate::commands::types::FetchArgs;
use crate::config::BoxcarConfig;
use anyhow::{Context, Result};
use boxcar_records::{fetch_archive, FetchOutcome};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::time::Duration;

pub async fn execute(args: FetchArgs, config: &BoxcarConfig) -> Result<()> {
    let url = args.url.unwrap_or_else(|| config.dataset.url.clone());
    let destination = args.output.unwrap_or_else(|| config.dataset.archive.clone());

    let spinner = (!args.json).then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Downloading {}", url.cyan()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    });

    let task_url = url.clone();
    let task_destination = destination.clone();
    let result = tokio::task::spawn_blocking(move || fetch_archive(&task_url, &task_destination, args.force))
        .await
        .context("Download task panicked")?;

    if let Some(ref spinner) = spinner {
        spinner.finish_and_clear();
    }
    let outcome = result.with_context(|| format!("Failed to fetch {url}"))?;

    if args.json {
        let (status, bytes) = match outcome {
            FetchOutcome::Downloaded { bytes } => ("downloaded", Some(bytes)),
            FetchOutcome::AlreadyPresent => ("already_present", None),
        };
        let out = json!({ "url": url, "path": destination, "status": status, "bytes": bytes });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match outcome {
        FetchOutcome::Downloaded { bytes } => println!(
            "{} Downloaded {} {}",
            "✓".green(),
            destination.display().to_string().cyan(),
            format!("({bytes} bytes)").dimmed()
        ),
        FetchOutcome::AlreadyPresent => println!(
            "{} {} already present {}",
            "•".dimmed(),
            destination.display().to_string().cyan(),
            "(use --force to download again)".dimmed()
        ),
    }
    Ok(())
}
