use crate::error::{RecordError, RecordResult};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Binary (not pickled) CIFAR-10 distribution.
pub const CIFAR10_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { bytes: u64 },
    AlreadyPresent,
}

/// Download `url` to `destination` unless it already exists (or `force` is set).
///
/// The body is streamed to a temporary file next to `destination` and renamed
/// into place once complete.
pub fn fetch_archive(url: &str, destination: &Path, force: bool) -> RecordResult<FetchOutcome> {
    if destination.exists() && !force {
        info!(path = %destination.display(), "archive already present, skipping download");
        return Ok(FetchOutcome::AlreadyPresent);
    }

    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| RecordError::write_failure(dir, e))?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(600))
        .build()
        .map_err(|e| RecordError::source_unavailable(url, e))?;

    info!(%url, "downloading archive");
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| RecordError::source_unavailable(url, e))?;
    if !response.status().is_success() {
        return Err(RecordError::source_unavailable(url, format!("HTTP {}", response.status())));
    }

    let mut temp = tempfile::Builder::new()
        .prefix(".boxcar-download-")
        .tempfile_in(dir)
        .map_err(|e| RecordError::write_failure(destination, e))?;
    let bytes = response
        .copy_to(&mut temp)
        .map_err(|e| RecordError::source_unavailable(url, e))?;
    temp.as_file().sync_all().map_err(|e| RecordError::write_failure(destination, e))?;
    temp.persist(destination).map_err(|e| RecordError::write_failure(destination, e.error))?;

    info!(path = %destination.display(), bytes, "archive downloaded");
    Ok(FetchOutcome::Downloaded { bytes })
}
