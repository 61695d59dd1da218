//! `boxcar upload`: push a converted dataset to object storage.

use crate::commands::print_outcome;
use crate::commands::types::UploadArgs;
use crate::config::BoxcarConfig;
use anyhow::{Context, Result};
use boxcar_container::{AwsCliStore, ObjectStore};

pub async fn execute(args: UploadArgs, config: &BoxcarConfig) -> Result<()> {
    let source = args.source.unwrap_or_else(|| config.dataset.output.clone());
    let target = config.storage.target(args.bucket, args.prefix)?;
    let store = AwsCliStore::new().with_region(args.region.or_else(|| config.storage.region.clone()));

    let outcome = store
        .upload_dir(&source, &target)
        .await
        .with_context(|| format!("Failed to upload {} to {target}", source.display()))?
        .into_result()
        .with_context(|| format!("Upload to {target} failed"))?;

    print_outcome(&format!("Uploaded to {target}"), &outcome);
    Ok(())
}
