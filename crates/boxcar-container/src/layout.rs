use crate::error::ContainerResult;
use crate::hyperparams::Hyperparameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the platform mounts the training tree inside the container.
pub const CONTAINER_ROOT: &str = "/opt/ml";

/// Content type advertised for converted split files.
pub const RECORDS_CONTENT_TYPE: &str = "application/x-boxcar-records";

const LOCAL_HOST: &str = "algo-1";

/// Filesystem layout of the training/serving contract.
///
/// The container reads `input/config/*` and `input/data/<channel>/`, writes the
/// trained model to `model/`, and reports failures in `output/failure`. For
/// local runs the same tree is created under a host directory and mounted at
/// `/opt/ml`.
#[derive(Debug, Clone)]
pub struct MlLayout {
    root: PathBuf,
}

impl MlLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Layout as seen from inside the container.
    #[must_use]
    pub fn container() -> Self {
        Self::new(PathBuf::from(CONTAINER_ROOT))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("input").join("config")
    }

    #[must_use]
    pub fn hyperparameters_path(&self) -> PathBuf {
        self.config_dir().join("hyperparameters.json")
    }

    #[must_use]
    pub fn resource_config_path(&self) -> PathBuf {
        self.config_dir().join("resourceconfig.json")
    }

    #[must_use]
    pub fn input_data_config_path(&self) -> PathBuf {
        self.config_dir().join("inputdataconfig.json")
    }

    #[must_use]
    pub fn channel_dir(&self, channel: &str) -> PathBuf {
        self.root.join("input").join("data").join(channel)
    }

    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        self.root.join("model")
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    #[must_use]
    pub fn failure_path(&self) -> PathBuf {
        self.output_dir().join("failure")
    }

    pub fn ensure_dirs(&self, channel: &str) -> ContainerResult<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::create_dir_all(self.channel_dir(channel))?;
        std::fs::create_dir_all(self.model_dir())?;
        std::fs::create_dir_all(self.output_dir())?;
        Ok(())
    }

    /// Build a local training tree: config files for a single host plus a copy
    /// of `data_files` in the channel directory.
    pub fn prepare_local(
        &self,
        hyperparameters: &Hyperparameters,
        channel: &str,
        data_files: &[PathBuf],
    ) -> ContainerResult<()> {
        self.ensure_dirs(channel)?;
        hyperparameters.write_to(&self.hyperparameters_path())?;

        let resources = ResourceConfig { current_host: LOCAL_HOST.to_string(), hosts: vec![LOCAL_HOST.to_string()] };
        std::fs::write(self.resource_config_path(), serde_json::to_vec_pretty(&resources)?)?;

        let mut channels = BTreeMap::new();
        channels.insert(channel.to_string(), ChannelConfig::file_mode(RECORDS_CONTENT_TYPE));
        std::fs::write(self.input_data_config_path(), serde_json::to_vec_pretty(&channels)?)?;

        let dest = self.channel_dir(channel);
        for file in data_files {
            let Some(name) = file.file_name() else { continue };
            std::fs::copy(file, dest.join(name))?;
        }
        debug!(root = %self.root.display(), channel, files = data_files.len(), "local training tree prepared");
        Ok(())
    }

    /// Failure reason written by a failed training run, if any.
    pub fn read_failure(&self) -> ContainerResult<Option<String>> {
        match std::fs::read_to_string(self.failure_path()) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceConfig {
    pub current_host: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChannelConfig {
    pub content_type: String,
    pub training_input_mode: String,
    #[serde(rename = "S3DistributionType")]
    pub s3_distribution_type: String,
    pub record_wrapper_type: String,
}

impl ChannelConfig {
    #[must_use]
    pub fn file_mode(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            training_input_mode: "File".to_string(),
            s3_distribution_type: "FullyReplicated".to_string(),
            record_wrapper_type: "None".to_string(),
        }
    }
}
