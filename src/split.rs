//! Stratified train/test split and k-fold assignment.
//!
//! Both operations work per label: rows are grouped by label (keeping input
//! order), each group is shuffled by a fresh RNG seeded with the configured
//! seed, and groups are concatenated negatives first. The result does not
//! depend on how labels are interleaved in the input.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::config::SplitConfig;
use crate::domain::{Label, Partition, Record};
use crate::error::CurateError;
use crate::table::{BASE_COLUMNS, RecordTable, base_fields, tsv_writer, write_row};

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: RecordTable,
    pub test: RecordTable,
    pub warnings: Vec<SplitWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SplitWarning {
    /// A subset's positive fraction is further from the source's than allowed.
    RatioDrift {
        partition: Partition,
        expected: f64,
        observed: f64,
        tolerance: f64,
    },
}

impl fmt::Display for SplitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitWarning::RatioDrift {
                partition,
                expected,
                observed,
                tolerance,
            } => write!(
                f,
                "{partition} positive fraction {observed:.3} differs from {expected:.3} by more than {tolerance}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedRecord {
    pub record: Record,
    pub fold: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldWarning {
    /// Fewer rows of this label than folds: some folds get none.
    SparseLabel {
        label: Label,
        count: usize,
        k_folds: usize,
    },
}

impl fmt::Display for FoldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldWarning::SparseLabel {
                label,
                count,
                k_folds,
            } => write!(
                f,
                "only {count} {} record(s) for {k_folds} folds; at least one fold has none",
                label.name()
            ),
        }
    }
}

/// Per-label row counts of one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoldCounts {
    pub fold: usize,
    pub negative: usize,
    pub positive: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAssignment {
    pub k_folds: usize,
    pub rows: Vec<FoldedRecord>,
    pub warnings: Vec<FoldWarning>,
}

impl FoldAssignment {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fold_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k_folds];
        for row in &self.rows {
            sizes[row.fold] += 1;
        }
        sizes
    }

    pub fn fold_label_counts(&self, label: Label) -> Vec<usize> {
        let mut counts = vec![0; self.k_folds];
        for row in self.rows.iter().filter(|row| row.record.label == label) {
            counts[row.fold] += 1;
        }
        counts
    }

    pub fn fold_counts(&self) -> Vec<FoldCounts> {
        let negative = self.fold_label_counts(Label::Negative);
        let positive = self.fold_label_counts(Label::Positive);
        negative
            .into_iter()
            .zip(positive)
            .enumerate()
            .map(|(fold, (negative, positive))| FoldCounts {
                fold,
                negative,
                positive,
            })
            .collect()
    }

    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), CurateError> {
        let mut writer = tsv_writer(writer);
        let mut header = BASE_COLUMNS.to_vec();
        header.extend(["label", "fold"]);
        write_row(&mut writer, &header)?;
        for row in &self.rows {
            let mut fields = base_fields(&row.record).to_vec();
            fields.push(row.record.label.to_string());
            fields.push(row.fold.to_string());
            write_row(&mut writer, &fields)?;
        }
        writer
            .flush()
            .map_err(|err| CurateError::Filesystem(err.to_string()))
    }
}

/// Splits each label group at `floor(train_fraction * n)`; the remainder is test.
pub fn split(records: &RecordTable, config: &SplitConfig) -> Result<Split, CurateError> {
    config.validate()?;
    let mut train = RecordTable::default();
    let mut test = RecordTable::default();

    for (label, mut group) in label_groups(records) {
        shuffle_group(&mut group, config.seed);
        let n_train = train_count(group.len(), config.train_fraction);
        if !group.is_empty() && (n_train == 0 || n_train == group.len()) {
            tracing::warn!(
                label = label.name(),
                size = group.len(),
                train = n_train,
                "label group too small to populate both partitions"
            );
        }
        for (idx, record) in group.into_iter().enumerate() {
            if idx < n_train {
                train.push("split", record)?;
            } else {
                test.push("split", record)?;
            }
        }
    }

    let warnings = ratio_drift(records, &train, &test, config.ratio_tolerance);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(train = train.len(), test = test.len(), "split finished");
    Ok(Split {
        train,
        test,
        warnings,
    })
}

/// Deals fold ids round-robin over the shuffled label groups. The counter
/// carries over from one label group to the next, so fold sizes differ by at
/// most one overall and per label.
pub fn assign_folds(
    train: &RecordTable,
    config: &SplitConfig,
) -> Result<FoldAssignment, CurateError> {
    config.validate()?;
    let k_folds = config.k_folds;
    let mut groups = label_groups(train);
    let mut rows = Vec::with_capacity(train.len());
    let mut warnings = Vec::new();
    let mut next_fold = 0usize;

    for label in Label::ALL {
        let mut group = groups.remove(&label).unwrap_or_default();
        if group.len() < k_folds {
            let warning = FoldWarning::SparseLabel {
                label,
                count: group.len(),
                k_folds,
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
        shuffle_group(&mut group, config.seed);
        for record in group {
            rows.push(FoldedRecord {
                record,
                fold: next_fold,
            });
            next_fold = (next_fold + 1) % k_folds;
        }
    }

    Ok(FoldAssignment {
        k_folds,
        rows,
        warnings,
    })
}

fn positive_fraction(table: &RecordTable) -> Option<f64> {
    if table.is_empty() {
        return None;
    }
    Some(table.count(Label::Positive) as f64 / table.len() as f64)
}

fn ratio_drift(
    source: &RecordTable,
    train: &RecordTable,
    test: &RecordTable,
    tolerance: f64,
) -> Vec<SplitWarning> {
    let Some(expected) = positive_fraction(source) else {
        return Vec::new();
    };
    [(Partition::Train, train), (Partition::Test, test)]
        .into_iter()
        .filter_map(|(partition, subset)| {
            let observed = positive_fraction(subset)?;
            ((observed - expected).abs() > tolerance + 1e-9).then_some(SplitWarning::RatioDrift {
                partition,
                expected,
                observed,
                tolerance,
            })
        })
        .collect()
}

fn label_groups(records: &RecordTable) -> BTreeMap<Label, Vec<Record>> {
    let mut groups = BTreeMap::<Label, Vec<Record>>::new();
    for record in records {
        groups.entry(record.label).or_default().push(record.clone());
    }
    groups
}

fn shuffle_group(group: &mut [Record], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    group.shuffle(&mut rng);
}

fn train_count(n: usize, train_fraction: f64) -> usize {
    // epsilon keeps e.g. 0.29 * 100 from flooring to 28
    let raw = (n as f64 * train_fraction + 1e-9).floor() as usize;
    raw.min(n)
}
