//! Boxcar Container
//!
//! Narrow, structured access to the external tools around a training image:
//! - Building, pushing and running the image (`ContainerOps`, `DockerOps`)
//! - The `/opt/ml` training/serving directory contract (`MlLayout`)
//! - Pass-through hyperparameters (`Hyperparameters`)
//! - Dataset upload to object storage (`ObjectStore`, `AwsCliStore`)

pub mod docker;
pub mod error;
pub mod exec;
pub mod hyperparams;
pub mod image;
pub mod layout;
pub mod ops;
pub mod storage;

pub use docker::DockerOps;
pub use error::{ContainerError, ContainerResult};
pub use exec::{run_tool, ExecOutcome};
pub use hyperparams::Hyperparameters;
pub use image::ImageRef;
pub use layout::{MlLayout, CONTAINER_ROOT};
pub use ops::{ContainerOps, ServeOptions, SERVING_PORT};
pub use storage::{AwsCliStore, ObjectStore, StorageTarget};
