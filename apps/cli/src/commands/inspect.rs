//! `boxcar inspect`: read record files back and check them against the manifest.

use crate::commands::types::InspectArgs;
use anyhow::{bail, Context, Result};
use boxcar_records::manifest::sha256_file;
use boxcar_records::{DatasetManifest, FrameReader, Split, MANIFEST_FILE};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct FileSummary {
    path: PathBuf,
    records: u64,
    bytes: u64,
    labels: BTreeMap<u32, u64>,
    /// `[label, height, width, channels]` of the first records read.
    head: Vec<[u32; 4]>,
    /// Set when a manifest entry was compared against this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest_match: Option<bool>,
}

fn summarize(path: &Path, show: usize) -> Result<FileSummary> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let bytes = file.metadata()?.len();
    let mut reader = FrameReader::new(BufReader::new(file));

    let mut summary = FileSummary {
        path: path.to_path_buf(),
        records: 0,
        bytes,
        labels: BTreeMap::new(),
        head: Vec::new(),
        manifest_match: None,
    };
    while let Some(record) = reader.read_frame().with_context(|| format!("Failed to read {}", path.display()))? {
        summary.records += 1;
        *summary.labels.entry(record.label).or_insert(0) += 1;
        if summary.head.len() < show {
            summary.head.push([record.label, record.height, record.width, record.channels]);
        }
    }
    Ok(summary)
}

fn inspect_dir(dir: &Path, show: usize) -> Result<Vec<FileSummary>> {
    let manifest = if dir.join(MANIFEST_FILE).exists() {
        Some(DatasetManifest::read(dir).context("Failed to read dataset manifest")?)
    } else {
        None
    };

    let mut summaries = Vec::new();
    for split in Split::ALL {
        let path = dir.join(split.file_name());
        if !path.exists() {
            if manifest.as_ref().and_then(|m| m.artifact(split)).is_some() {
                bail!("{} is listed in {MANIFEST_FILE} but missing", path.display());
            }
            continue;
        }

        let mut summary = summarize(&path, show)?;
        if let Some(artifact) = manifest.as_ref().and_then(|m| m.artifact(split)) {
            let digest = sha256_file(&path)?;
            summary.manifest_match =
                Some(artifact.records == summary.records && artifact.bytes == summary.bytes && artifact.sha256 == digest);
        }
        summaries.push(summary);
    }

    if summaries.is_empty() {
        bail!("No record files found in {}", dir.display());
    }
    Ok(summaries)
}

pub async fn execute(args: InspectArgs) -> Result<()> {
    let path = args.path.clone();
    let show = args.show;
    let summaries = tokio::task::spawn_blocking(move || {
        if path.is_dir() { inspect_dir(&path, show) } else { summarize(&path, show).map(|s| vec![s]) }
    })
    .await
    .context("Inspect task panicked")??;

    let mismatched: Vec<_> = summaries
        .iter()
        .filter(|s| s.manifest_match == Some(false))
        .map(|s| s.path.display().to_string())
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_summaries(&summaries);
    }

    if !mismatched.is_empty() {
        bail!("Manifest mismatch for {}", mismatched.join(", "));
    }
    Ok(())
}

fn print_summaries(summaries: &[FileSummary]) {
    println!();
    for summary in summaries {
        let status = match summary.manifest_match {
            Some(true) => "✓ manifest".green(),
            Some(false) => "✗ manifest".red(),
            None => "".normal(),
        };
        println!("{} {}", summary.path.display().to_string().bold().cyan(), status);
        println!("  {:<8} {}", "records", summary.records);
        println!("  {:<8} {}", "bytes", summary.bytes);
        let labels = summary
            .labels
            .iter()
            .map(|(label, count)| format!("{label}:{count}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {:<8} {}", "labels", labels.dimmed());
        for (i, [label, height, width, channels]) in summary.head.iter().enumerate() {
            println!("  #{i:<7} label={label} shape={height}x{width}x{channels}");
        }
        println!();
    }
}
