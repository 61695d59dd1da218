//! `boxcar build` and `boxcar push`.

use crate::commands::print_outcome;
use crate::commands::types::{BuildArgs, ImageArgs, PushArgs};
use crate::config::BoxcarConfig;
use anyhow::{Context, Result};
use boxcar_container::{ContainerOps, DockerOps, ImageRef};

/// Resolve the image and runtime for a container command.
pub(crate) fn resolve(args: &ImageArgs, config: &BoxcarConfig) -> Result<(ImageRef, DockerOps)> {
    let image = config.image.image_ref(args.image.as_deref())?;
    let runtime = args.runtime.clone().unwrap_or_else(|| config.image.runtime.clone());
    Ok((image, DockerOps::new().with_program(runtime)))
}

pub async fn build(args: BuildArgs, config: &BoxcarConfig) -> Result<()> {
    let (image, mut ops) = resolve(&args.image, config)?;
    if let Some(dockerfile) = args.file.or_else(|| config.image.dockerfile.clone()) {
        ops = ops.with_dockerfile(dockerfile);
    }
    let context = args.context.unwrap_or_else(|| config.image.context.clone());

    let outcome = ops
        .build(&context, &image)
        .await
        .with_context(|| format!("Failed to build {}", image.local()))?
        .into_result()
        .with_context(|| format!("Build of {} failed", image.local()))?;

    print_outcome(&format!("Built {}", image.local()), &outcome);
    Ok(())
}

pub async fn push(args: PushArgs, config: &BoxcarConfig) -> Result<()> {
    let (image, ops) = resolve(&args.image, config)?;
    let remote = image.remote().context("Pushing requires a registry. Set [image].registry or pass --image")?;

    let outcome = ops
        .push(&image)
        .await
        .with_context(|| format!("Failed to push {remote}"))?
        .into_result()
        .with_context(|| format!("Push of {remote} failed"))?;

    print_outcome(&format!("Pushed {remote}"), &outcome);
    Ok(())
}
