//! Object storage upload of converted datasets.

use crate::error::{ContainerError, ContainerResult};
use crate::exec::{run_tool, ExecOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Bucket and key prefix a dataset is placed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageTarget {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
}

impl StorageTarget {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> ContainerResult<Self> {
        let target = Self { bucket: bucket.into(), prefix: prefix.into() };
        target.validate()?;
        Ok(target)
    }

    /// Parse `s3://bucket[/prefix]`.
    pub fn parse(uri: &str) -> ContainerResult<Self> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| ContainerError::InvalidStorageTarget(format!("expected s3:// URI, got {uri}")))?;
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        Self::new(bucket, prefix)
    }

    pub fn validate(&self) -> ContainerResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(ContainerError::InvalidStorageTarget("bucket must not be empty".to_string()));
        }
        if self.bucket.contains('/') {
            return Err(ContainerError::InvalidStorageTarget(format!(
                "bucket must not contain '/': {}",
                self.bucket
            )));
        }
        Ok(())
    }

    /// `s3://bucket/prefix`, without a trailing slash.
    #[must_use]
    pub fn uri(&self) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("s3://{}", self.bucket)
        } else {
            format!("s3://{}/{prefix}", self.bucket)
        }
    }
}

impl std::fmt::Display for StorageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Destination for converted datasets.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload every file under `local_dir` below `target`.
    async fn upload_dir(&self, local_dir: &Path, target: &StorageTarget) -> ContainerResult<ExecOutcome>;
}

/// Uploads through the `aws` CLI.
#[derive(Debug, Clone)]
pub struct AwsCliStore {
    program: String,
    region: Option<String>,
}

impl Default for AwsCliStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsCliStore {
    #[must_use]
    pub fn new() -> Self {
        Self { program: "aws".to_string(), region: None }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    fn upload_args(&self, local_dir: &Path, target: &StorageTarget) -> Vec<String> {
        let mut args = vec![
            "s3".to_string(),
            "cp".to_string(),
            "--recursive".to_string(),
            local_dir.display().to_string(),
            target.uri(),
        ];
        if let Some(ref region) = self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args
    }
}

#[async_trait]
impl ObjectStore for AwsCliStore {
    async fn upload_dir(&self, local_dir: &Path, target: &StorageTarget) -> ContainerResult<ExecOutcome> {
        target.validate()?;
        if !local_dir.is_dir() {
            return Err(ContainerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset directory not found: {}", local_dir.display()),
            )));
        }
        info!(source = %local_dir.display(), target = %target, "uploading dataset");
        run_tool(&self.program, self.upload_args(local_dir, target)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_rendering() {
        assert_eq!(StorageTarget::new("bucket", "data/cifar10/").unwrap().uri(), "s3://bucket/data/cifar10");
        assert_eq!(StorageTarget::new("bucket", "").unwrap().uri(), "s3://bucket");
    }

    #[test]
    fn test_parse_uri() {
        let t = StorageTarget::parse("s3://my-bucket/data/cifar10").unwrap();
        assert_eq!(t.bucket, "my-bucket");
        assert_eq!(t.prefix, "data/cifar10");
        assert!(StorageTarget::parse("gs://bucket").is_err());
        assert!(StorageTarget::parse("s3:///prefix").is_err());
    }

    #[test]
    fn test_upload_args_with_region() {
        let store = AwsCliStore::new().with_region(Some("us-west-2".to_string()));
        let target = StorageTarget::new("bucket", "data").unwrap();
        assert_eq!(
            store.upload_args(Path::new("/tmp/out"), &target),
            vec!["s3", "cp", "--recursive", "/tmp/out", "s3://bucket/data", "--region", "us-west-2"]
        );
    }

    #[tokio::test]
    async fn test_upload_missing_dir_fails_before_running_tool() {
        let store = AwsCliStore::new().with_program("boxcar-missing-aws");
        let target = StorageTarget::new("bucket", "data").unwrap();
        let err = store.upload_dir(Path::new("/definitely/not/here"), &target).await.unwrap_err();
        assert!(matches!(err, ContainerError::Io(_)));
    }
}
