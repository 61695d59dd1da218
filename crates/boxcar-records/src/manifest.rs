use crate::error::{RecordError, RecordResult};
use crate::frame::FRAME_TAG;
use crate::record::ImageGeometry;
use crate::split::{Split, SplitAssignment, SplitCounts};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

/// One converted split file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitArtifact {
    pub split: Split,
    /// File name relative to the dataset directory.
    pub file: String,
    pub records: u64,
    pub bytes: u64,
    pub sha256: String,
}

/// Description of a converted dataset directory.
///
/// Carries no timestamps so reconverting the same archive reproduces it byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub frame_tag: String,
    pub geometry: ImageGeometry,
    pub assignment: SplitAssignment,
    pub splits: Vec<SplitArtifact>,
}

impl DatasetManifest {
    #[must_use]
    pub fn new(geometry: ImageGeometry, assignment: SplitAssignment) -> Self {
        Self {
            frame_tag: String::from_utf8_lossy(&FRAME_TAG).into_owned(),
            geometry,
            assignment,
            splits: Vec::new(),
        }
    }

    pub fn read(dataset_dir: &Path) -> RecordResult<Self> {
        let path = dataset_dir.join(MANIFEST_FILE);
        let bytes = std::fs::read(&path)
            .map_err(|e| RecordError::source_unavailable(path.display().to_string(), e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[must_use]
    pub fn counts(&self) -> SplitCounts {
        let mut counts = SplitCounts::default();
        for artifact in &self.splits {
            counts.set(artifact.split, artifact.records);
        }
        counts
    }

    #[must_use]
    pub fn artifact(&self, split: Split) -> Option<&SplitArtifact> {
        self.splits.iter().find(|a| a.split == split)
    }
}

pub fn sha256_file(path: &Path) -> RecordResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn make_artifact(split: Split, path: &Path, records: u64) -> RecordResult<SplitArtifact> {
    let metadata = std::fs::metadata(path)?;
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| split.file_name());
    Ok(SplitArtifact { split, file, records, bytes: metadata.len(), sha256: sha256_file(path)? })
}
