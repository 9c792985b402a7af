use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::{CatalogSource, ExtractionTally, Extractor};
use crate::cluster::{ClusterOracle, ClusterTsv, reduce};
use crate::config::{ResolvedConfig, SplitConfig};
use crate::domain::{Label, Record};
use crate::error::CurateError;
use crate::merge::{MergedRecord, merge, write_merged_tsv};
use crate::report::{SummaryReport, summarize};
use crate::sequences::SequenceSource;
use crate::split::{FoldAssignment, FoldCounts, Split, assign_folds, split};
use crate::store::ArtifactStore;
use crate::table::RecordTable;

pub const STAGE_POSITIVE_BEFORE: &str = "Positive (Before Clustering)";
pub const STAGE_NEGATIVE_BEFORE: &str = "Negative (Before Clustering)";
pub const STAGE_POSITIVE_AFTER: &str = "Positive (After Clustering)";
pub const STAGE_NEGATIVE_AFTER: &str = "Negative (After Clustering)";
pub const STAGE_TRAIN: &str = "Train";
pub const STAGE_TEST: &str = "Test";

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractResult {
    pub label: String,
    pub table_path: String,
    pub fasta_path: String,
    pub tally: ExtractionTally,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurateResult {
    pub generated_at: String,
    pub seed: u64,
    pub k_folds: usize,
    pub train_fraction: f64,
    pub summary: SummaryReport,
    pub fold_sizes: Vec<usize>,
    pub fold_counts: Vec<FoldCounts>,
    pub warnings: Vec<String>,
    pub outputs: Vec<String>,
}

/// In-memory result of the stages after extraction.
#[derive(Debug, Clone)]
pub struct Curation {
    pub filtered_positive: RecordTable,
    pub filtered_negative: RecordTable,
    pub split: Split,
    pub folds: FoldAssignment,
    pub merged: Vec<MergedRecord>,
    pub summary: SummaryReport,
}

/// Runs reduction, split, fold assignment, merge and summary in order.
/// Any integrity failure or merge gap aborts the run.
pub fn curate(
    positive: &RecordTable,
    negative: &RecordTable,
    positive_oracle: &dyn ClusterOracle,
    negative_oracle: &dyn ClusterOracle,
    sequences: &dyn SequenceSource,
    config: &SplitConfig,
    sink: &dyn ProgressSink,
) -> Result<Curation, CurateError> {
    config.validate()?;

    let start = Instant::now();
    let filtered_positive = reduce(positive, &positive_oracle.cluster(positive)?)?;
    let filtered_negative = reduce(negative, &negative_oracle.cluster(negative)?)?;
    sink.event(ProgressEvent {
        message: format!(
            "phase=Reduce; kept {} positive and {} negative representatives",
            filtered_positive.len(),
            filtered_negative.len()
        ),
        elapsed: Some(start.elapsed()),
    });

    let combined = RecordTable::new(
        "split input",
        filtered_negative
            .iter()
            .chain(filtered_positive.iter())
            .cloned()
            .collect::<Vec<Record>>(),
    )?;

    let start = Instant::now();
    let split = split(&combined, config)?;
    let folds = assign_folds(&split.train, config)?;
    sink.event(ProgressEvent {
        message: format!(
            "phase=Split; train={} test={} folds={:?}",
            split.train.len(),
            split.test.len(),
            folds.fold_sizes()
        ),
        elapsed: Some(start.elapsed()),
    });

    let start = Instant::now();
    let merged = merge(&folds, &split.test, sequences).into_checked()?;
    sink.event(ProgressEvent {
        message: format!("phase=Merge; resolved {} sequences", merged.len()),
        elapsed: Some(start.elapsed()),
    });

    let summary = summarize([
        (STAGE_POSITIVE_BEFORE, positive),
        (STAGE_NEGATIVE_BEFORE, negative),
        (STAGE_POSITIVE_AFTER, &filtered_positive),
        (STAGE_NEGATIVE_AFTER, &filtered_negative),
        (STAGE_TRAIN, &split.train),
        (STAGE_TEST, &split.test),
    ]);

    Ok(Curation {
        filtered_positive,
        filtered_negative,
        split,
        folds,
        merged,
        summary,
    })
}

/// File-backed driver over an [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct Curator {
    store: ArtifactStore,
    config: ResolvedConfig,
}

impl Curator {
    pub fn new(store: ArtifactStore, config: ResolvedConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Extracts one class from `source` and writes its table, FASTA and tally.
    pub fn extract(
        &self,
        source: &dyn CatalogSource,
        label: Label,
        sink: &dyn ProgressSink,
    ) -> Result<ExtractResult, CurateError> {
        self.store.ensure_root()?;
        sink.event(ProgressEvent {
            message: format!("phase=Extract; reading {} catalog", label.name()),
            elapsed: None,
        });
        let start = Instant::now();
        let extraction = Extractor::new(&self.config.extraction).run(source, label)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Extract; accepted {} of {} entries",
                extraction.tally.accepted, extraction.tally.seen
            ),
            elapsed: Some(start.elapsed()),
        });

        let table_path = self.store.extracted_table_path(label);
        let fasta_path = self.store.fasta_path(label);
        ArtifactStore::write_atomic(&table_path, |w| extraction.table.write_tsv(w, false))?;
        ArtifactStore::write_atomic(&fasta_path, |w| {
            extraction
                .sequences
                .write_fasta(w)
                .map_err(|err| CurateError::Filesystem(err.to_string()))
        })?;
        ArtifactStore::write_json(&self.store.tally_path(label), &extraction.tally)?;

        Ok(ExtractResult {
            label: label.name().to_string(),
            table_path: table_path.to_string(),
            fasta_path: fasta_path.to_string(),
            tally: extraction.tally,
        })
    }

    /// Runs every stage after extraction from the files in the store. The
    /// cluster tables must have been produced by the external clustering run.
    pub fn curate(&self, sink: &dyn ProgressSink) -> Result<CurateResult, CurateError> {
        sink.event(ProgressEvent {
            message: format!("phase=Load; reading inputs from {}", self.store.root()),
            elapsed: None,
        });
        let positive =
            RecordTable::read_tsv(&self.store.extracted_table_path(Label::Positive), Label::Positive)?;
        let negative =
            RecordTable::read_tsv(&self.store.extracted_table_path(Label::Negative), Label::Negative)?;
        let mut sequences = ArtifactStore::read_fasta(&self.store.fasta_path(Label::Negative))?;
        sequences.extend(
            "fasta",
            ArtifactStore::read_fasta(&self.store.fasta_path(Label::Positive))?,
        )?;
        let positive_oracle = ClusterTsv::new(self.store.cluster_path(Label::Positive));
        let negative_oracle = ClusterTsv::new(self.store.cluster_path(Label::Negative));

        let curation = curate(
            &positive,
            &negative,
            &positive_oracle,
            &negative_oracle,
            &sequences,
            &self.config.split,
            sink,
        )?;
        self.write_outputs(&curation)
    }

    /// Recounts the stage tables already written to the store.
    pub fn summarize(&self) -> Result<SummaryReport, CurateError> {
        let store = &self.store;
        let positive =
            RecordTable::read_tsv(&store.extracted_table_path(Label::Positive), Label::Positive)?;
        let negative =
            RecordTable::read_tsv(&store.extracted_table_path(Label::Negative), Label::Negative)?;
        let filtered_positive =
            RecordTable::read_tsv(&store.filtered_table_path(Label::Positive), Label::Positive)?;
        let filtered_negative =
            RecordTable::read_tsv(&store.filtered_table_path(Label::Negative), Label::Negative)?;
        let train = RecordTable::read_labelled_tsv(&store.train_path())?;
        let test = RecordTable::read_labelled_tsv(&store.test_path())?;

        Ok(summarize([
            (STAGE_POSITIVE_BEFORE, &positive),
            (STAGE_NEGATIVE_BEFORE, &negative),
            (STAGE_POSITIVE_AFTER, &filtered_positive),
            (STAGE_NEGATIVE_AFTER, &filtered_negative),
            (STAGE_TRAIN, &train),
            (STAGE_TEST, &test),
        ]))
    }

    fn write_outputs(&self, curation: &Curation) -> Result<CurateResult, CurateError> {
        let mut outputs = Vec::new();
        for (label, table) in [
            (Label::Positive, &curation.filtered_positive),
            (Label::Negative, &curation.filtered_negative),
        ] {
            let path = self.store.filtered_table_path(label);
            ArtifactStore::write_atomic(&path, |w| table.write_tsv(w, false))?;
            outputs.push(path.to_string());
        }

        let train_path = self.store.train_path();
        ArtifactStore::write_atomic(&train_path, |w| curation.folds.write_tsv(w))?;
        outputs.push(train_path.to_string());

        let test_path = self.store.test_path();
        ArtifactStore::write_atomic(&test_path, |w| curation.split.test.write_tsv(w, true))?;
        outputs.push(test_path.to_string());

        let merged_path = self.store.merged_path();
        ArtifactStore::write_atomic(&merged_path, |w| write_merged_tsv(&curation.merged, w))?;
        outputs.push(merged_path.to_string());

        let summary_path = self.store.summary_path();
        outputs.push(summary_path.to_string());

        let split = &self.config.split;
        let result = CurateResult {
            generated_at: chrono::Utc::now().to_rfc3339(),
            seed: split.seed,
            k_folds: split.k_folds,
            train_fraction: split.train_fraction,
            summary: curation.summary.clone(),
            fold_sizes: curation.folds.fold_sizes(),
            fold_counts: curation.folds.fold_counts(),
            warnings: curation
                .split
                .warnings
                .iter()
                .map(|w| w.to_string())
                .chain(curation.folds.warnings.iter().map(|w| w.to_string()))
                .collect(),
            outputs,
        };
        ArtifactStore::write_json(&summary_path, &result)?;
        Ok(result)
    }
}
