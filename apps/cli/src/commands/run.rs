//! `boxcar train` and `boxcar serve`: run the image against a local `/opt/ml` tree.

use crate::commands::image::resolve;
use crate::commands::print_outcome;
use crate::commands::types::{ServeArgs, TrainArgs};
use crate::config::BoxcarConfig;
use anyhow::{Context, Result};
use boxcar_container::{ContainerOps, Hyperparameters, MlLayout, ServeOptions};
use boxcar_records::Split;
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Merge configured, file and `--set` hyperparameters, later sources winning.
fn collect_hyperparameters(config: &BoxcarConfig, file: Option<&Path>, sets: &[String]) -> Result<Hyperparameters> {
    let mut hyperparameters = config.hyperparameters.clone();
    if let Some(path) = file {
        let from_file = Hyperparameters::from_file(path)
            .with_context(|| format!("Failed to load hyperparameters from {}", path.display()))?;
        hyperparameters.merge(&from_file);
    }
    for set in sets {
        let (key, raw) = set
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{set}'"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        hyperparameters.insert(key.trim(), value);
    }
    Ok(hyperparameters)
}

/// Split files present in a converted dataset directory.
fn dataset_files(dir: &Path) -> Vec<PathBuf> {
    Split::ALL.iter().map(|split| dir.join(split.file_name())).filter(|path| path.is_file()).collect()
}

pub async fn train(args: TrainArgs, config: &BoxcarConfig) -> Result<()> {
    let (image, ops) = resolve(&args.image, config)?;
    let layout = MlLayout::new(args.local_dir.unwrap_or_else(|| config.local.dir.clone()));
    let data_dir = args.data.unwrap_or_else(|| config.dataset.output.clone());
    let files = dataset_files(&data_dir);
    if files.is_empty() {
        tracing::warn!(dir = %data_dir.display(), "no record files found; training channel will be empty");
    }

    let hyperparameters = collect_hyperparameters(config, args.hyperparameters.as_deref(), &args.set)?;
    layout
        .prepare_local(&hyperparameters, &config.local.channel, &files)
        .with_context(|| format!("Failed to prepare {}", layout.root().display()))?;

    let outcome = ops
        .run_train(&image, &layout)
        .await
        .with_context(|| format!("Failed to start training with {}", image.local()))?;

    if !outcome.success() {
        if let Ok(Some(reason)) = layout.read_failure() {
            eprintln!("{} {}", "training failure:".red(), reason.trim());
        }
    }
    let outcome = outcome.into_result().context("Training run failed")?;

    print_outcome("Training finished", &outcome);
    println!("  model: {}", layout.model_dir().display().to_string().cyan());
    Ok(())
}

pub async fn serve(args: ServeArgs, config: &BoxcarConfig) -> Result<()> {
    let (image, ops) = resolve(&args.image, config)?;
    let layout = MlLayout::new(args.local_dir.unwrap_or_else(|| config.local.dir.clone()));
    let options = ServeOptions { host_port: args.port.unwrap_or(config.local.port), detach: args.detach };

    if !options.detach {
        println!(
            "{} {} on port {}",
            "Serving".bold(),
            image.local().cyan(),
            options.host_port.to_string().cyan()
        );
    }

    let outcome = ops
        .run_serve(&image, &layout, &options)
        .await
        .with_context(|| format!("Failed to start serving with {}", image.local()))?
        .into_result()
        .context("Serving container failed")?;

    if options.detach {
        print_outcome(&format!("Serving on port {}", options.host_port), &outcome);
        println!("  container: {}", outcome.stdout.trim().dimmed());
    } else {
        print_outcome("Serving container exited", &outcome);
    }
    Ok(())
}
