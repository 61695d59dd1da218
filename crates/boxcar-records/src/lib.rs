//! Boxcar Records
//!
//! Converts an image-classification archive into per-split binary record files:
//! - Reading raw batch files from a `.tar.gz` archive (`BatchSet`)
//! - Routing batches to train / validation / eval (`SplitAssignment`)
//! - Encoding records as checksummed frames (`FrameWriter`, `FrameReader`)
//! - Writing each split atomically plus a dataset manifest (`RecordConverter`)

pub mod archive;
pub mod checksum;
pub mod converter;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod manifest;
pub mod progress;
pub mod record;
pub mod split;

pub use archive::{BatchReader, BatchSet};
pub use converter::{convert, RecordConverter};
pub use error::{RecordError, RecordResult};
pub use fetch::{fetch_archive, FetchOutcome, CIFAR10_URL};
pub use frame::{encode_frame, FrameReader, FrameWriter, FRAME_TAG};
pub use manifest::{DatasetManifest, SplitArtifact, MANIFEST_FILE};
pub use progress::{NoopProgressSink, ProgressEvent, ProgressSink, TracingProgressSink};
pub use record::{ImageGeometry, Record};
pub use split::{Split, SplitAssignment, SplitCounts};
