use std::io::Write;

use serde::Serialize;

use crate::domain::{Accession, Label, Partition, Record};
use crate::error::CurateError;
use crate::sequences::SequenceSource;
use crate::split::FoldAssignment;
use crate::table::{BASE_COLUMNS, RecordTable, base_fields, tsv_writer, write_row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRecord {
    pub record: Record,
    pub sequence: String,
    pub partition: Partition,
    pub fold: Option<usize>,
}

/// A split-table accession with no resolvable sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeGap {
    pub accession: Accession,
    pub partition: Partition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub rows: Vec<MergedRecord>,
    pub missing: Vec<MergeGap>,
}

impl MergeOutcome {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn count(&self, partition: Partition, label: Label) -> usize {
        self.rows
            .iter()
            .filter(|row| row.partition == partition && row.record.label == label)
            .count()
    }

    /// A non-empty manifest means the split tables and the sequence source
    /// drifted apart, so it is an error here rather than a partial result.
    pub fn into_checked(self) -> Result<Vec<MergedRecord>, CurateError> {
        if self.missing.is_empty() {
            return Ok(self.rows);
        }
        Err(CurateError::MergeGap {
            accessions: self
                .missing
                .iter()
                .map(|gap| gap.accession.to_string())
                .collect(),
        })
    }
}

/// Resolves the sequence of every train row (with its fold) and then every
/// test row. Unresolved accessions are reported in `missing`, not dropped silently.
pub fn merge(
    folds: &FoldAssignment,
    test: &RecordTable,
    source: &dyn SequenceSource,
) -> MergeOutcome {
    let train_rows = folds
        .rows
        .iter()
        .map(|row| (&row.record, Partition::Train, Some(row.fold)));
    let test_rows = test.iter().map(|record| (record, Partition::Test, None));

    let mut outcome = MergeOutcome::default();
    for (record, partition, fold) in train_rows.chain(test_rows) {
        match source.sequence(&record.accession) {
            Some(sequence) => outcome.rows.push(MergedRecord {
                record: record.clone(),
                sequence: sequence.to_string(),
                partition,
                fold,
            }),
            None => outcome.missing.push(MergeGap {
                accession: record.accession.clone(),
                partition,
            }),
        }
    }

    if !outcome.missing.is_empty() {
        tracing::error!(
            missing = outcome.missing.len(),
            "merge left accessions without a sequence"
        );
    }
    outcome
}

pub const MERGED_COLUMNS: [&str; 4] = ["sequence", "label", "fold", "partition"];

pub fn write_merged_tsv<W: Write>(rows: &[MergedRecord], writer: W) -> Result<(), CurateError> {
    let mut writer = tsv_writer(writer);
    let mut header = BASE_COLUMNS.to_vec();
    header.extend(MERGED_COLUMNS);
    write_row(&mut writer, &header)?;
    for row in rows {
        let mut fields = base_fields(&row.record).to_vec();
        fields.push(row.sequence.clone());
        fields.push(row.record.label.to_string());
        fields.push(row.fold.map(|f| f.to_string()).unwrap_or_default());
        fields.push(row.partition.to_string());
        write_row(&mut writer, &fields)?;
    }
    writer
        .flush()
        .map_err(|err| CurateError::Filesystem(err.to_string()))
}
