//! Access to raw batch files inside a dataset archive.

use crate::error::{RecordError, RecordResult};
use crate::frame::read_full;
use crate::record::{ImageGeometry, Record};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

/// Batch files made available from an archive or an already extracted directory.
///
/// When backed by an archive, the extracted tree lives in a temporary directory
/// that is removed when this value is dropped.
#[derive(Debug)]
pub struct BatchSet {
    root: PathBuf,
    index: HashMap<String, Vec<PathBuf>>,
    _extracted: Option<TempDir>,
}

impl BatchSet {
    /// Open `source`: a `.tar.gz` archive is extracted to a temporary directory,
    /// a directory is indexed in place.
    pub fn open(source: &Path) -> RecordResult<Self> {
        let label = source.display().to_string();
        let metadata = std::fs::metadata(source).map_err(|e| RecordError::source_unavailable(&label, e))?;

        if metadata.is_dir() {
            let index = index_files(source)?;
            return Ok(Self { root: source.to_path_buf(), index, _extracted: None });
        }

        let temp = tempfile::Builder::new()
            .prefix("boxcar-extract-")
            .tempdir()
            .map_err(|e| RecordError::source_unavailable(&label, format!("cannot create extraction dir: {e}")))?;
        extract_tar_gz(source, temp.path())?;

        let index = index_files(temp.path())?;
        debug!(source = %label, files = index.len(), dir = %temp.path().display(), "archive extracted");
        Ok(Self { root: temp.path().to_path_buf(), index, _extracted: Some(temp) })
    }

    /// Directory the batch files were read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a batch file by name. It must appear exactly once in the tree.
    pub fn locate(&self, batch: &str) -> RecordResult<&Path> {
        match self.index.get(batch).map(Vec::as_slice) {
            Some([path]) => Ok(path),
            Some(paths) if paths.len() > 1 => Err(RecordError::source_unavailable(
                self.root.display().to_string(),
                format!("batch file {batch} appears {} times", paths.len()),
            )),
            _ => Err(RecordError::source_unavailable(
                self.root.display().to_string(),
                format!("batch file {batch} not found"),
            )),
        }
    }

    /// Open a sequential reader over the records of one batch file.
    pub fn reader(&self, batch: &str, geometry: ImageGeometry) -> RecordResult<BatchReader<BufReader<File>>> {
        let path = self.locate(batch)?;
        let file = File::open(path).map_err(|e| RecordError::source_unavailable(path.display().to_string(), e))?;
        Ok(BatchReader::new(batch, BufReader::new(file), geometry))
    }
}

fn extract_tar_gz(source: &Path, dest: &Path) -> RecordResult<()> {
    let label = source.display().to_string();
    let file = File::open(source).map_err(|e| RecordError::source_unavailable(&label, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    archive
        .unpack(dest)
        .map_err(|e| RecordError::source_unavailable(&label, format!("cannot extract archive: {e}")))
}

fn index_files(root: &Path) -> RecordResult<HashMap<String, Vec<PathBuf>>> {
    let mut index: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).display().to_string();
            RecordError::source_unavailable(path, format!("cannot index source tree: {e}"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            index.entry(name.to_string()).or_default().push(entry.path().to_path_buf());
        }
    }
    Ok(index)
}

/// Reads `(label, image)` records from one raw batch file.
///
/// Each record is one label byte followed by `geometry.image_len()` pixel bytes.
#[derive(Debug)]
pub struct BatchReader<R: Read> {
    name: String,
    inner: R,
    geometry: ImageGeometry,
    next_index: u64,
    done: bool,
}

impl<R: Read> BatchReader<R> {
    pub fn new(name: impl Into<String>, inner: R, geometry: ImageGeometry) -> Self {
        Self { name: name.into(), inner, geometry, next_index: 0, done: false }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the record the next call will return.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next_index
    }

    fn malformed(&self, reason: String) -> RecordError {
        RecordError::MalformedRecord { batch: self.name.clone(), record: self.next_index, reason }
    }

    pub fn read_record(&mut self) -> RecordResult<Option<Record>> {
        self.geometry.validate()?;
        let mut buf = vec![0u8; self.geometry.batch_record_len()];
        let got = read_full(&mut self.inner, &mut buf)
            .map_err(|e| RecordError::source_unavailable(self.name.clone(), e))?;
        if got == 0 {
            return Ok(None);
        }
        if got < buf.len() {
            return Err(self.malformed(format!("truncated record: {got} of {} bytes", buf.len())));
        }

        let label = u32::from(buf[0]);
        if label >= self.geometry.num_classes {
            return Err(self.malformed(format!(
                "label {label} outside 0..{}",
                self.geometry.num_classes
            )));
        }

        let image = buf.split_off(1);
        self.next_index += 1;
        Ok(Some(Record::new(label, &self.geometry, image)))
    }
}

impl<R: Read> Iterator for BatchReader<R> {
    type Item = RecordResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.read_record().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TINY: ImageGeometry = ImageGeometry { height: 1, width: 2, channels: 2, num_classes: 3 };

    #[test]
    fn test_batch_reader_yields_records_in_order() {
        let bytes = vec![0, 1, 2, 3, 4, 2, 5, 6, 7, 8];
        let records: Vec<Record> = BatchReader::new("b", Cursor::new(bytes), TINY)
            .collect::<RecordResult<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, 0);
        assert_eq!(records[0].image, vec![1, 2, 3, 4]);
        assert_eq!(records[1].label, 2);
        assert_eq!(records[1].image, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_truncated_trailing_record_is_malformed() {
        let bytes = vec![0, 1, 2, 3, 4, 1, 5];
        let mut reader = BatchReader::new("data_batch_9.bin", Cursor::new(bytes), TINY);
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        match err {
            RecordError::MalformedRecord { batch, record, .. } => {
                assert_eq!(batch, "data_batch_9.bin");
                assert_eq!(record, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_label_out_of_range_is_malformed() {
        let bytes = vec![3, 1, 2, 3, 4];
        let err = BatchReader::new("b", Cursor::new(bytes), TINY).read_record().unwrap_err();
        assert!(matches!(err, RecordError::MalformedRecord { record: 0, ref reason, .. } if reason.contains("label 3")));
    }

    #[test]
    fn test_open_missing_source() {
        let err = BatchSet::open(Path::new("/definitely/not/here.tar.gz")).unwrap_err();
        assert!(matches!(err, RecordError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_open_non_archive_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("junk.tar.gz");
        std::fs::write(&path, b"not gzip at all").unwrap();
        let err = BatchSet::open(&path).unwrap_err();
        assert!(matches!(err, RecordError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_directory_source_locates_nested_batches() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("cifar-10-batches-bin");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("data_batch_1.bin"), [0u8; 5]).unwrap();

        let set = BatchSet::open(temp.path()).unwrap();
        assert!(set.locate("data_batch_1.bin").unwrap().ends_with("cifar-10-batches-bin/data_batch_1.bin"));
        assert!(matches!(set.locate("data_batch_2.bin"), Err(RecordError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_index_errors_are_reported() {
        let err = index_files(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, RecordError::SourceUnavailable { ref reason, .. } if reason.contains("cannot index")));
    }

    #[test]
    fn test_invalid_geometry_fails_before_reading() {
        let huge = ImageGeometry { height: u32::MAX, width: u32::MAX, channels: 3, num_classes: 10 };
        let err = BatchReader::new("b", Cursor::new(vec![0u8; 8]), huge).read_record().unwrap_err();
        assert!(matches!(err, RecordError::InvalidGeometry(_)));
    }

    #[test]
    fn test_extracted_tree_removed_on_drop() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let temp = TempDir::new().unwrap();
        let archive_path = temp.path().join("batches.tar.gz");
        let mut builder = tar::Builder::new(GzEncoder::new(File::create(&archive_path).unwrap(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append_data(&mut header, "batches/a.bin", &[0u8; 5][..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let set = BatchSet::open(&archive_path).unwrap();
        let root = set.root().to_path_buf();
        assert!(set.locate("a.bin").unwrap().starts_with(&root));
        assert!(root.is_dir());
        drop(set);
        assert!(!root.exists());
    }

    #[test]
    fn test_directory_source_is_left_in_place() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.bin"), [0u8; 5]).unwrap();
        drop(BatchSet::open(temp.path()).unwrap());
        assert!(temp.path().join("a.bin").exists());
    }

    #[test]
    fn test_duplicate_batch_names_are_ambiguous() {
        let temp = TempDir::new().unwrap();
        for dir in ["a", "b"] {
            std::fs::create_dir_all(temp.path().join(dir)).unwrap();
            std::fs::write(temp.path().join(dir).join("x.bin"), [0u8; 5]).unwrap();
        }
        let set = BatchSet::open(temp.path()).unwrap();
        let err = set.locate("x.bin").unwrap_err();
        assert!(err.to_string().contains("appears 2 times"));
    }
}
