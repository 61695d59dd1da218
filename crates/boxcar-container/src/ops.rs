//! Container operations trait.

use crate::error::ContainerResult;
use crate::exec::ExecOutcome;
use crate::image::ImageRef;
use crate::layout::MlLayout;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Port the serving entrypoint listens on inside the container.
pub const SERVING_PORT: u16 = 8080;

/// Options for `ContainerOps::run_serve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeOptions {
    /// Host port mapped to the container's serving port.
    pub host_port: u16,
    /// Start the container in the background; the outcome's stdout then holds its id.
    pub detach: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self { host_port: SERVING_PORT, detach: false }
    }
}

/// Build, publish and run the training/serving image.
///
/// Every method returns the tool's structured outcome. Spawn failures are
/// errors; a non-zero exit is reported in the outcome and can be turned into
/// an error with `ExecOutcome::into_result`. Nothing is retried.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Name of the container runtime, e.g. `docker`.
    fn runtime(&self) -> &str;

    /// Build `image` from the build context directory.
    async fn build(&self, context: &Path, image: &ImageRef) -> ContainerResult<ExecOutcome>;

    /// Publish `image` to `<registry>/<repository>:<tag>`.
    async fn push(&self, image: &ImageRef) -> ContainerResult<ExecOutcome>;

    /// Run the image with the `train` argument against a local training tree.
    async fn run_train(&self, image: &ImageRef, layout: &MlLayout) -> ContainerResult<ExecOutcome>;

    /// Run the image with the `serve` argument, loading the model from the same tree.
    async fn run_serve(
        &self,
        image: &ImageRef,
        layout: &MlLayout,
        options: &ServeOptions,
    ) -> ContainerResult<ExecOutcome>;
}
