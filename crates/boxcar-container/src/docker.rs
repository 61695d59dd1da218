//! Docker CLI-backed container operations.

use crate::error::ContainerResult;
use crate::exec::{run_tool, ExecOutcome};
use crate::image::ImageRef;
use crate::layout::{MlLayout, CONTAINER_ROOT};
use crate::ops::{ContainerOps, ServeOptions, SERVING_PORT};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Drives `docker` (or a CLI-compatible runtime such as `podman`).
#[derive(Debug, Clone)]
pub struct DockerOps {
    /// Runtime executable.
    program: String,
    /// Dockerfile to build from, when not `<context>/Dockerfile`.
    dockerfile: Option<PathBuf>,
}

impl Default for DockerOps {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerOps {
    #[must_use]
    pub fn new() -> Self {
        Self { program: "docker".to_string(), dockerfile: None }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_dockerfile(mut self, dockerfile: PathBuf) -> Self {
        self.dockerfile = Some(dockerfile);
        self
    }

    fn build_args(&self, context: &Path, image: &ImageRef) -> Vec<String> {
        let mut args = vec!["build".to_string(), "-t".to_string(), image.local()];
        if let Some(ref dockerfile) = self.dockerfile {
            args.push("-f".to_string());
            args.push(dockerfile.display().to_string());
        }
        args.push(context.display().to_string());
        args
    }

    fn tag_args(image: &ImageRef) -> ContainerResult<Vec<String>> {
        Ok(vec!["tag".to_string(), image.local(), image.remote()?])
    }

    fn push_args(image: &ImageRef) -> ContainerResult<Vec<String>> {
        Ok(vec!["push".to_string(), image.remote()?])
    }

    fn mount_arg(layout: &MlLayout) -> ContainerResult<String> {
        // Bind mounts need an absolute host path.
        let host = std::fs::canonicalize(layout.root())?;
        Ok(format!("{}:{CONTAINER_ROOT}", host.display()))
    }

    fn train_args(image: &ImageRef, mount: String) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            mount,
            image.local(),
            "train".to_string(),
        ]
    }

    fn serve_args(image: &ImageRef, mount: String, options: &ServeOptions) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        if options.detach {
            args.push("-d".to_string());
        }
        args.extend([
            "-v".to_string(),
            mount,
            "-p".to_string(),
            format!("{}:{SERVING_PORT}", options.host_port),
            image.local(),
            "serve".to_string(),
        ]);
        args
    }
}

#[async_trait]
impl ContainerOps for DockerOps {
    fn runtime(&self) -> &str {
        &self.program
    }

    async fn build(&self, context: &Path, image: &ImageRef) -> ContainerResult<ExecOutcome> {
        info!(image = %image.local(), context = %context.display(), "building image");
        run_tool(&self.program, self.build_args(context, image)).await
    }

    async fn push(&self, image: &ImageRef) -> ContainerResult<ExecOutcome> {
        let tag_args = Self::tag_args(image)?;
        let push_args = Self::push_args(image)?;

        let tagged = run_tool(&self.program, tag_args).await?;
        if !tagged.success() {
            warn!(image = %image.local(), exit_code = ?tagged.exit_code, "tagging failed, not pushing");
            return Ok(tagged);
        }

        info!(image = %image, "pushing image");
        run_tool(&self.program, push_args).await
    }

    async fn run_train(&self, image: &ImageRef, layout: &MlLayout) -> ContainerResult<ExecOutcome> {
        let mount = Self::mount_arg(layout)?;
        info!(image = %image.local(), root = %layout.root().display(), "running training container");
        run_tool(&self.program, Self::train_args(image, mount)).await
    }

    async fn run_serve(
        &self,
        image: &ImageRef,
        layout: &MlLayout,
        options: &ServeOptions,
    ) -> ContainerResult<ExecOutcome> {
        let mount = Self::mount_arg(layout)?;
        info!(image = %image.local(), port = options.host_port, detach = options.detach, "starting serving container");
        run_tool(&self.program, Self::serve_args(image, mount, options)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageRef {
        ImageRef::parse("registry.example.com/boxcar-cifar10:v1").unwrap()
    }

    #[test]
    fn test_build_args() {
        let ops = DockerOps::new();
        let args = ops.build_args(Path::new("container"), &image());
        assert_eq!(args, vec!["build", "-t", "boxcar-cifar10:v1", "container"]);

        let ops = DockerOps::new().with_dockerfile(PathBuf::from("container/Dockerfile.gpu"));
        let args = ops.build_args(Path::new("container"), &image());
        assert_eq!(
            args,
            vec!["build", "-t", "boxcar-cifar10:v1", "-f", "container/Dockerfile.gpu", "container"]
        );
    }

    #[test]
    fn test_push_targets_registry_reference() {
        assert_eq!(
            DockerOps::tag_args(&image()).unwrap(),
            vec!["tag", "boxcar-cifar10:v1", "registry.example.com/boxcar-cifar10:v1"]
        );
        assert_eq!(
            DockerOps::push_args(&image()).unwrap(),
            vec!["push", "registry.example.com/boxcar-cifar10:v1"]
        );
        assert!(DockerOps::push_args(&ImageRef::parse("local-only").unwrap()).is_err());
    }

    #[test]
    fn test_train_and_serve_args() {
        let mount = "/tmp/local:/opt/ml".to_string();
        assert_eq!(
            DockerOps::train_args(&image(), mount.clone()),
            vec!["run", "--rm", "-v", "/tmp/local:/opt/ml", "boxcar-cifar10:v1", "train"]
        );

        let options = ServeOptions { host_port: 9000, detach: true };
        assert_eq!(
            DockerOps::serve_args(&image(), mount, &options),
            vec!["run", "--rm", "-d", "-v", "/tmp/local:/opt/ml", "-p", "9000:8080", "boxcar-cifar10:v1", "serve"]
        );
    }

    #[test]
    fn test_mount_requires_existing_root() {
        let layout = MlLayout::new(PathBuf::from("/definitely/not/a/local/tree"));
        assert!(DockerOps::mount_arg(&layout).is_err());
    }

    #[tokio::test]
    async fn test_missing_runtime_is_tool_unavailable() {
        let ops = DockerOps::new().with_program("boxcar-missing-runtime");
        let err = ops.build(Path::new("."), &image()).await.unwrap_err();
        assert!(matches!(err, crate::error::ContainerError::ToolUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_push_stops_after_failed_tag() {
        // `false` ignores its arguments and exits 1, standing in for a failing runtime.
        let ops = DockerOps::new().with_program("false");
        let outcome = ops.push(&image()).await.unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.args[0], "tag");
    }
}
