//! CLI configuration loading and merging.
//!
//! Configuration precedence:
//! 1. CLI arguments and `BOXCAR_*` environment variables (handled by clap)
//! 2. Local config file (./boxcar.toml)
//! 3. Global config file (~/.boxcar/config.toml)
//! 4. Defaults
//!
//! The loaded value is passed explicitly to every command.

use anyhow::{Context, Result};
use boxcar_container::{Hyperparameters, ImageRef, StorageTarget};
use boxcar_records::{ImageGeometry, SplitAssignment, CIFAR10_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = "boxcar.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoxcarConfig {
    /// Log level used when `--log-level` is not given
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub local: LocalConfig,

    /// Passed through verbatim to the training container
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_url")]
    pub url: String,
    #[serde(default = "default_archive")]
    pub archive: PathBuf,
    #[serde(default = "default_dataset_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub geometry: ImageGeometry,
    #[serde(default = "SplitAssignment::cifar10")]
    pub splits: SplitAssignment,
}

fn default_dataset_url() -> String {
    CIFAR10_URL.to_string()
}

fn default_archive() -> PathBuf {
    PathBuf::from("data").join("cifar-10-binary.tar.gz")
}

fn default_dataset_output() -> PathBuf {
    PathBuf::from("data").join("cifar10")
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: default_dataset_url(),
            archive: default_archive(),
            output: default_dataset_output(),
            geometry: ImageGeometry::default(),
            splits: SplitAssignment::cifar10(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_name")]
    pub name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub registry: Option<String>,
    /// Build context directory
    #[serde(default = "default_context")]
    pub context: PathBuf,
    #[serde(default)]
    pub dockerfile: Option<PathBuf>,
    /// Container runtime executable
    #[serde(default = "default_runtime")]
    pub runtime: String,
}

fn default_image_name() -> String {
    "boxcar-cifar10".to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_context() -> PathBuf {
    PathBuf::from("container")
}

fn default_runtime() -> String {
    "docker".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            name: default_image_name(),
            tag: default_tag(),
            registry: None,
            context: default_context(),
            dockerfile: None,
            runtime: default_runtime(),
        }
    }
}

impl ImageConfig {
    /// Resolve the image reference, letting an explicit `[registry/]name[:tag]` win.
    pub fn image_ref(&self, explicit: Option<&str>) -> Result<ImageRef> {
        if let Some(reference) = explicit {
            let mut image = ImageRef::parse(reference)?;
            if image.registry.is_none() {
                if let Some(ref registry) = self.registry {
                    image = image.with_registry(registry.clone())?;
                }
            }
            return Ok(image);
        }

        let mut image = ImageRef::new(self.name.clone())?.with_tag(self.tag.clone())?;
        if let Some(ref registry) = self.registry {
            image = image.with_registry(registry.clone())?;
        }
        Ok(image)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub region: Option<String>,
}

fn default_prefix() -> String {
    "data/cifar10".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { bucket: None, prefix: default_prefix(), region: None }
    }
}

impl StorageConfig {
    pub fn target(&self, bucket: Option<String>, prefix: Option<String>) -> Result<StorageTarget> {
        let bucket = bucket
            .or_else(|| self.bucket.clone())
            .context("No storage bucket configured. Pass --bucket or set [storage].bucket in boxcar.toml")?;
        Ok(StorageTarget::new(bucket, prefix.unwrap_or_else(|| self.prefix.clone()))?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Host directory mounted at /opt/ml for local runs
    #[serde(default = "default_local_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("local_test")
}

fn default_channel() -> String {
    "training".to_string()
}

fn default_port() -> u16 {
    boxcar_container::SERVING_PORT
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self { dir: default_local_dir(), channel: default_channel(), port: default_port() }
    }
}

impl BoxcarConfig {
    /// Get default global configuration file path.
    pub fn default_global_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".boxcar").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// With an explicit path only that file is read and it must exist.
    /// Otherwise the global and local files are merged, local winning, and
    /// missing files are skipped.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let table = read_table(path)?
                .with_context(|| format!("Configuration file not found: {}", path.display()))?;
            return Self::from_table(table, path);
        }

        let mut merged = toml::Table::new();
        if let Some(global) = Self::default_global_path() {
            if let Some(table) = read_table(&global)? {
                merge_tables(&mut merged, table);
            }
        }
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if let Some(table) = read_table(&local)? {
            merge_tables(&mut merged, table);
        }
        Self::from_table(merged, &local)
    }

    fn from_table(table: toml::Table, origin: &Path) -> Result<Self> {
        let config: Self = toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("Failed to parse configuration ({})", origin.display()))?;
        config.dataset.splits.validate()?;
        config.dataset.geometry.validate()?;
        Ok(config)
    }
}

fn read_table(path: &Path) -> Result<Option<toml::Table>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    let table = toml::from_str::<toml::Table>(&content)
        .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
    Ok(Some(table))
}

/// Merge `overlay` into `base`, recursing into nested tables. Values from `overlay` win.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
