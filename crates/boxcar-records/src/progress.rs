use crate::split::Split;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    SplitStarted { split: Split, batches: usize },
    BatchFinished { split: Split, batch: String, records: u64 },
    SplitFinished { split: Split, records: u64 },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::SplitStarted { split, batches } => info!(%split, batches, "converting split"),
            ProgressEvent::BatchFinished { split, batch, records } => {
                debug!(%split, %batch, records, "batch converted");
            }
            ProgressEvent::SplitFinished { split, records } => info!(%split, records, "split written"),
        }
    }
}
