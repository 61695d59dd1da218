use crate::error::{RecordError, RecordResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Validation,
    Eval,
}

impl Split {
    /// All splits in conversion order.
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Eval];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Eval => "eval",
        }
    }

    /// Name of the split's output file inside the destination directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.records", self.as_str())
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Split {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "validation" => Ok(Split::Validation),
            "eval" => Ok(Split::Eval),
            other => Err(RecordError::InvalidAssignment(format!("unknown split: {other}"))),
        }
    }
}

/// Static mapping from raw batch file name to split.
///
/// Each split lists its batch files in read order. Serialized as a table,
/// e.g. in TOML:
///
/// ```toml
/// train = ["data_batch_1.bin", "data_batch_2.bin"]
/// validation = ["data_batch_5.bin"]
/// eval = ["test_batch.bin"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitAssignment {
    #[serde(default)]
    pub train: Vec<String>,
    #[serde(default)]
    pub validation: Vec<String>,
    #[serde(default)]
    pub eval: Vec<String>,
}

impl SplitAssignment {
    /// CIFAR-10 binary distribution: batches 1-4 train, batch 5 validates, the test batch evaluates.
    #[must_use]
    pub fn cifar10() -> Self {
        Self {
            train: (1..=4).map(|i| format!("data_batch_{i}.bin")).collect(),
            validation: vec!["data_batch_5.bin".to_string()],
            eval: vec!["test_batch.bin".to_string()],
        }
    }

    #[must_use]
    pub fn batches(&self, split: Split) -> &[String] {
        match split {
            Split::Train => &self.train,
            Split::Validation => &self.validation,
            Split::Eval => &self.eval,
        }
    }

    /// Builder-style helper to append a batch file to a split.
    #[must_use]
    pub fn with_batch(mut self, batch: impl Into<String>, split: Split) -> Self {
        let batch = batch.into();
        match split {
            Split::Train => self.train.push(batch),
            Split::Validation => self.validation.push(batch),
            Split::Eval => self.eval.push(batch),
        }
        self
    }

    /// Every assigned batch file, split order first, then listed order.
    pub fn all_batches(&self) -> impl Iterator<Item = (Split, &str)> {
        Split::ALL
            .into_iter()
            .flat_map(move |split| self.batches(split).iter().map(move |b| (split, b.as_str())))
    }

    /// A batch may feed only one split, and at least one batch must be assigned.
    pub fn validate(&self) -> RecordResult<()> {
        let mut seen = HashSet::new();
        for (split, batch) in self.all_batches() {
            if batch.trim().is_empty() {
                return Err(RecordError::InvalidAssignment(format!("{split} lists an empty batch name")));
            }
            if !seen.insert(batch) {
                return Err(RecordError::InvalidAssignment(format!(
                    "batch {batch} is assigned more than once"
                )));
            }
        }
        if seen.is_empty() {
            return Err(RecordError::InvalidAssignment("no batch files assigned".to_string()));
        }
        Ok(())
    }
}

/// Number of records written per split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCounts(pub BTreeMap<Split, u64>);

impl SplitCounts {
    #[must_use]
    pub fn get(&self, split: Split) -> u64 {
        self.0.get(&split).copied().unwrap_or(0)
    }

    pub(crate) fn set(&mut self, split: Split, count: u64) {
        self.0.insert(split, count);
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cifar10_assignment_is_disjoint() {
        let a = SplitAssignment::cifar10();
        a.validate().unwrap();
        assert_eq!(a.batches(Split::Train).len(), 4);
        assert_eq!(a.batches(Split::Validation), ["data_batch_5.bin"]);
        assert_eq!(a.batches(Split::Eval), ["test_batch.bin"]);
    }

    #[test]
    fn test_duplicate_batch_rejected() {
        let a = SplitAssignment::default()
            .with_batch("a.bin", Split::Train)
            .with_batch("a.bin", Split::Eval);
        assert!(matches!(a.validate(), Err(RecordError::InvalidAssignment(_))));
    }

    #[test]
    fn test_empty_assignment_rejected() {
        assert!(SplitAssignment::default().validate().is_err());
    }

    #[test]
    fn test_all_batches_order() {
        let a = SplitAssignment::default()
            .with_batch("e.bin", Split::Eval)
            .with_batch("t2.bin", Split::Train)
            .with_batch("t1.bin", Split::Train);
        let order: Vec<_> = a.all_batches().collect();
        assert_eq!(
            order,
            vec![(Split::Train, "t2.bin"), (Split::Train, "t1.bin"), (Split::Eval, "e.bin")]
        );
    }

    #[test]
    fn test_assignment_from_toml() {
        let a: SplitAssignment = toml::from_str(
            r#"
            train = ["x.bin"]
            eval = ["y.bin"]
            "#,
        )
        .unwrap();
        assert_eq!(a.train, vec!["x.bin"]);
        assert!(a.validation.is_empty());
    }

    #[test]
    fn test_split_parse_and_file_name() {
        assert_eq!("validation".parse::<Split>().unwrap(), Split::Validation);
        assert!("test".parse::<Split>().is_err());
        assert_eq!(Split::Eval.file_name(), "eval.records");
    }

    #[test]
    fn test_counts_total() {
        let mut counts = SplitCounts::default();
        counts.set(Split::Train, 4);
        counts.set(Split::Eval, 2);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.get(Split::Validation), 0);
    }
}
