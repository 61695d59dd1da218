use crate::archive::BatchSet;
use crate::error::{RecordError, RecordResult};
use crate::frame::{encode_frame, FrameWriter};
use crate::manifest::{make_artifact, DatasetManifest, MANIFEST_FILE};
use crate::progress::{NoopProgressSink, ProgressEvent, ProgressSink};
use crate::record::ImageGeometry;
use crate::split::{Split, SplitAssignment, SplitCounts};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Converts a raw image dataset into per-split frame files.
///
/// Every split is first written to a temporary file in the destination
/// directory. Only when all of them are complete is the old manifest removed
/// and each temp file renamed over `<split>.records`, so a failed run leaves
/// the previous outputs exactly as they were.
pub struct RecordConverter {
    geometry: ImageGeometry,
    write_manifest: bool,
    progress: Box<dyn ProgressSink>,
}

impl Default for RecordConverter {
    fn default() -> Self {
        Self::new(ImageGeometry::default())
    }
}

impl RecordConverter {
    #[must_use]
    pub fn new(geometry: ImageGeometry) -> Self {
        Self { geometry, write_manifest: true, progress: Box::new(NoopProgressSink) }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_manifest(mut self, write_manifest: bool) -> Self {
        self.write_manifest = write_manifest;
        self
    }

    #[must_use]
    pub fn geometry(&self) -> ImageGeometry {
        self.geometry
    }

    pub fn convert(
        &self,
        source: &Path,
        destination: &Path,
        assignment: &SplitAssignment,
    ) -> RecordResult<SplitCounts> {
        self.geometry.validate()?;
        assignment.validate()?;

        // Every source check happens before the destination is touched.
        let batches = BatchSet::open(source)?;
        for (_, batch) in assignment.all_batches() {
            batches.locate(batch)?;
        }

        std::fs::create_dir_all(destination).map_err(|e| RecordError::write_failure(destination, e))?;

        // Stage every split first; nothing is replaced unless all of them are written.
        let mut counts = SplitCounts::default();
        let mut staged = Vec::new();
        for split in Split::ALL {
            let names = assignment.batches(split);
            if names.is_empty() {
                counts.set(split, 0);
                continue;
            }
            let (temp, records) = self.write_split(&batches, split, names, destination)?;
            counts.set(split, records);
            staged.push((split, temp, records));
        }

        // An earlier manifest no longer describes the files about to be replaced.
        let manifest_path = destination.join(MANIFEST_FILE);
        match std::fs::remove_file(&manifest_path) {
            Ok(()) => debug!(path = %manifest_path.display(), "removed previous manifest"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(RecordError::write_failure(&manifest_path, e)),
        }

        let mut manifest = DatasetManifest::new(self.geometry, assignment.clone());
        for (split, temp, records) in staged {
            let target = destination.join(split.file_name());
            commit(temp, &target)?;
            self.progress.on_event(ProgressEvent::SplitFinished { split, records });
            if self.write_manifest {
                manifest.splits.push(make_artifact(split, &target, records)?);
            }
        }

        if self.write_manifest {
            let json = serde_json::to_vec_pretty(&manifest)?;
            write_atomic(&manifest_path, destination, &json)?;
        }

        info!(
            source = %source.display(),
            destination = %destination.display(),
            total = counts.total(),
            "conversion finished"
        );
        Ok(counts)
    }

    /// Write one split to a temporary file in `destination`, not yet renamed.
    fn write_split(
        &self,
        batches: &BatchSet,
        split: Split,
        names: &[String],
        destination: &Path,
    ) -> RecordResult<(NamedTempFile, u64)> {
        let target = destination.join(split.file_name());
        let temp = partial_file(destination, &target)?;
        debug!(%split, temp = %temp.path().display(), "writing split");
        self.progress.on_event(ProgressEvent::SplitStarted { split, batches: names.len() });

        let mut writer = FrameWriter::new(BufWriter::new(temp));
        for name in names {
            let mut reader = batches.reader(name, self.geometry)?;
            let before = writer.frames_written();
            while let Some(record) = reader.read_record()? {
                let frame = encode_frame(&record).map_err(|e| e.at_position(name.as_str(), reader.position() - 1))?;
                writer.write_encoded(&frame).map_err(|e| into_write_failure(e, &target))?;
            }
            self.progress.on_event(ProgressEvent::BatchFinished {
                split,
                batch: name.clone(),
                records: writer.frames_written() - before,
            });
        }

        let records = writer.frames_written();
        let temp = writer
            .into_inner()
            .into_inner()
            .map_err(|e| RecordError::write_failure(&target, e.into_error()))?;
        Ok((temp, records))
    }
}

/// Convert with CIFAR-10 geometry and no progress reporting.
pub fn convert(source: &Path, destination: &Path, assignment: &SplitAssignment) -> RecordResult<SplitCounts> {
    RecordConverter::default().convert(source, destination, assignment)
}

fn partial_file(dir: &Path, target: &Path) -> RecordResult<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".boxcar-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| RecordError::write_failure(target, e))
}

fn commit(temp: NamedTempFile, target: &Path) -> RecordResult<()> {
    temp.as_file().sync_all().map_err(|e| RecordError::write_failure(target, e))?;
    temp.persist(target).map_err(|e| RecordError::write_failure(target, e.error))?;
    Ok(())
}

fn write_atomic(target: &Path, dir: &Path, bytes: &[u8]) -> RecordResult<()> {
    let mut temp = partial_file(dir, target)?;
    temp.write_all(bytes).map_err(|e| RecordError::write_failure(target, e))?;
    commit(temp, target)
}

fn into_write_failure(err: RecordError, target: &Path) -> RecordError {
    match err {
        RecordError::Io(e) => RecordError::write_failure(target, e),
        other => other,
    }
}
