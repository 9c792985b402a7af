use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CurateError {
    #[error("invalid UniProt accession: {0}")]
    InvalidAccession(String),

    #[error("invalid label: {0}")]
    InvalidLabel(String),

    #[error("invalid kingdom: {0}")]
    InvalidKingdom(String),

    #[error("invalid split configuration: {0}")]
    #[diagnostic(help("train_fraction must lie in (0, 1), k_folds in [2, 100] and ratio_tolerance in [0, 1]"))]
    InvalidSplit(String),

    #[error("[{stage}] accession {accession} is missing from the backing record table")]
    #[diagnostic(help("the stage inputs were not produced from the same extraction run"))]
    Integrity {
        stage: &'static str,
        accession: String,
    },

    #[error("[{stage}] accession {accession} appears more than once")]
    DuplicateAccession {
        stage: &'static str,
        accession: String,
    },

    #[error("accession {accession} is assigned to more than one cluster")]
    ConflictingCluster { accession: String },

    #[error("no sequence found for {} accession(s): {}", accessions.len(), accessions.join(", "))]
    #[diagnostic(help("every split-table accession must come from the FASTA files used to build it"))]
    MergeGap { accessions: Vec<String> },

    #[error("record {accession} has label {found}, expected {expected}")]
    LabelMismatch {
        accession: String,
        expected: String,
        found: String,
    },

    #[error("required input not found: {0}")]
    MissingInput(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to parse catalog: {0}")]
    CatalogParse(String),

    #[error("failed to parse table {path}: {message}")]
    TableParse { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
