//! Raw catalog entries to curated records.
//!
//! Entries are UniProtKB JSON objects as returned by the REST search endpoint.
//! Retrieval happens elsewhere; this module only sees materialized entries.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ExtractionConfig, NegativeCriteria, PositiveCriteria};
use crate::domain::{Accession, Kingdom, Label, Record};
use crate::error::CurateError;
use crate::sequences::SequenceMap;
use crate::table::RecordTable;

/// Supplier of raw catalog entries, fully materialized before extraction.
pub trait CatalogSource {
    fn entries(&self) -> Result<Vec<Value>, CurateError>;
}

impl CatalogSource for Vec<Value> {
    fn entries(&self) -> Result<Vec<Value>, CurateError> {
        Ok(self.clone())
    }
}

/// Saved search results on disk: a JSON array of entries, a `{"results": [...]}`
/// page, or several such pages one after another (e.g. one per line).
#[derive(Debug, Clone)]
pub struct JsonCatalogFile {
    path: Utf8PathBuf,
}

impl JsonCatalogFile {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for JsonCatalogFile {
    fn entries(&self) -> Result<Vec<Value>, CurateError> {
        if !self.path.as_std_path().exists() {
            return Err(CurateError::MissingInput(self.path.as_std_path().to_path_buf()));
        }
        let content = fs::read_to_string(self.path.as_std_path())
            .map_err(|err| CurateError::Filesystem(format!("read {}: {err}", self.path)))?;
        parse_catalog(&content)
    }
}

pub fn parse_catalog(content: &str) -> Result<Vec<Value>, CurateError> {
    let mut entries = Vec::new();
    for page in serde_json::Deserializer::from_str(content).into_iter::<Value>() {
        let page = page.map_err(|err| CurateError::CatalogParse(err.to_string()))?;
        match page {
            Value::Array(items) => entries.extend(items),
            Value::Object(mut obj) => match obj.remove("results") {
                Some(Value::Array(items)) => entries.extend(items),
                Some(_) => {
                    return Err(CurateError::CatalogParse(
                        "`results` is not an array".to_string(),
                    ));
                }
                None => entries.push(Value::Object(obj)),
            },
            _ => {
                return Err(CurateError::CatalogParse(
                    "expected an entry, an array of entries or a results page".to_string(),
                ));
            }
        }
    }
    Ok(entries)
}

/// Why an entry did not make it into a curated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MalformedEntry(&'static str),
    TooShort { length: u64 },
    Unreviewed,
    InsufficientEvidence,
    MissingSignal,
    /// A negative-class entry carries the feature that defines the positive class.
    UnexpectedSignal,
    /// The feature carries free text, so its exact boundary is not trusted.
    AnnotatedBoundary,
    UnresolvedBoundary,
    ShortSignal { length: u64 },
    DuplicateAccession,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MalformedEntry(_) => "malformed_entry",
            RejectReason::TooShort { .. } => "too_short",
            RejectReason::Unreviewed => "unreviewed",
            RejectReason::InsufficientEvidence => "insufficient_evidence",
            RejectReason::MissingSignal => "missing_signal",
            RejectReason::UnexpectedSignal => "unexpected_signal",
            RejectReason::AnnotatedBoundary => "annotated_boundary",
            RejectReason::UnresolvedBoundary => "unresolved_boundary",
            RejectReason::ShortSignal { .. } => "short_signal",
            RejectReason::DuplicateAccession => "duplicate_accession",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MalformedEntry(field) => write!(f, "missing or invalid {field}"),
            RejectReason::TooShort { length } => write!(f, "protein length {length} too short"),
            RejectReason::ShortSignal { length } => {
                write!(f, "signal peptide length {length} too short")
            }
            other => write!(f, "{}", other.code().replace('_', " ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub record: Record,
    pub sequence: String,
    /// Negatives only: a transmembrane helix starts near the N-terminus.
    pub n_terminal_tmh: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionTally {
    pub seen: usize,
    pub accepted: usize,
    pub rejected: BTreeMap<String, usize>,
    /// Accepted records per kingdom.
    pub kingdoms: BTreeMap<String, usize>,
    pub n_terminal_tmh: usize,
}

impl ExtractionTally {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn rejected_for(&self, code: &str) -> usize {
        self.rejected.get(code).copied().unwrap_or(0)
    }

    fn reject(&mut self, reason: &RejectReason) {
        *self.rejected.entry(reason.code().to_string()).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub label: Label,
    pub table: RecordTable,
    pub sequences: SequenceMap,
    pub tally: ExtractionTally,
}

pub struct Extractor<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, entry: &Value, label: Label) -> Result<Extracted, RejectReason> {
        match label {
            Label::Positive => extract_positive(entry, &self.config.positive),
            Label::Negative => extract_negative(entry, &self.config.negative),
        }
    }

    /// Extracts every entry of `source`. Rejections are tallied, never raised;
    /// only a source that cannot be read fails the call.
    pub fn run(&self, source: &dyn CatalogSource, label: Label) -> Result<Extraction, CurateError> {
        let entries = source.entries()?;
        let mut table = RecordTable::default();
        let mut sequences = SequenceMap::new();
        let mut tally = ExtractionTally::default();

        for entry in &entries {
            tally.seen += 1;
            let extracted = match self.extract(entry, label) {
                Ok(extracted) => extracted,
                Err(reason) => {
                    tracing::debug!(
                        accession = entry_accession(entry).unwrap_or("?"),
                        %reason,
                        "rejected catalog entry"
                    );
                    tally.reject(&reason);
                    continue;
                }
            };
            if table.contains(&extracted.record.accession) {
                tally.reject(&RejectReason::DuplicateAccession);
                continue;
            }
            sequences.insert(
                "extraction",
                extracted.record.accession.clone(),
                extracted.sequence,
            )?;
            if extracted.n_terminal_tmh {
                tally.n_terminal_tmh += 1;
            }
            *tally
                .kingdoms
                .entry(extracted.record.kingdom.to_string())
                .or_insert(0) += 1;
            table.push("extraction", extracted.record)?;
            tally.accepted += 1;
        }

        tracing::info!(
            label = label.name(),
            seen = tally.seen,
            accepted = tally.accepted,
            rejected = tally.rejected_total(),
            "extraction finished"
        );
        for (kingdom, count) in &tally.kingdoms {
            tracing::info!(
                label = label.name(),
                kingdom = kingdom.as_str(),
                count = *count,
                "kingdom distribution"
            );
        }

        Ok(Extraction {
            label,
            table,
            sequences,
            tally,
        })
    }
}

/// Positive-class extraction.
///
/// Only the first feature of the configured type is inspected; any later one is
/// ignored even when it would pass. The feature must have no description, a
/// numeric end, and a span of at least `min_signal_length` residues. The span
/// length becomes the cleavage site.
pub fn extract_positive(
    entry: &Value,
    criteria: &PositiveCriteria,
) -> Result<Extracted, RejectReason> {
    let base = BaseFields::parse(entry)?;
    check_upstream(
        entry,
        base.length,
        criteria.min_protein_length,
        criteria.require_reviewed,
        criteria.require_protein_level,
    )?;

    let feature = features(entry)
        .find(|f| feature_type(f) == Some(criteria.feature_type.as_str()))
        .ok_or(RejectReason::MissingSignal)?;

    let description = feature
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if !description.is_empty() {
        return Err(RejectReason::AnnotatedBoundary);
    }
    let start = location_value(feature, "start").ok_or(RejectReason::UnresolvedBoundary)?;
    let end = location_value(feature, "end").ok_or(RejectReason::UnresolvedBoundary)?;
    if end < start {
        return Err(RejectReason::UnresolvedBoundary);
    }
    let span = end - start + 1;
    if span < criteria.min_signal_length {
        return Err(RejectReason::ShortSignal { length: span });
    }

    Ok(base.into_extracted(Label::Positive, span, false))
}

/// Negative-class extraction: the entry is taken once the shared upstream
/// checks hold and it carries no feature of the excluded type.
pub fn extract_negative(
    entry: &Value,
    criteria: &NegativeCriteria,
) -> Result<Extracted, RejectReason> {
    let base = BaseFields::parse(entry)?;
    check_upstream(
        entry,
        base.length,
        criteria.min_protein_length,
        criteria.require_reviewed,
        criteria.require_protein_level,
    )?;

    let excluded = Some(criteria.excluded_feature_type.as_str());
    if features(entry).any(|f| feature_type(f) == excluded) {
        return Err(RejectReason::UnexpectedSignal);
    }

    let n_terminal_tmh = features(entry)
        .filter(|f| feature_type(f) == Some(criteria.tmh_feature_type.as_str()))
        .any(|f| location_value(f, "start").is_some_and(|start| start <= criteria.tmh_window));

    Ok(base.into_extracted(Label::Negative, 0, n_terminal_tmh))
}

struct BaseFields {
    accession: Accession,
    organism_name: String,
    kingdom: Kingdom,
    length: u64,
    sequence: String,
}

impl BaseFields {
    fn parse(entry: &Value) -> Result<Self, RejectReason> {
        let accession = entry_accession(entry)
            .and_then(|v| v.parse::<Accession>().ok())
            .ok_or(RejectReason::MalformedEntry("primaryAccession"))?;
        let organism = entry.get("organism");
        let organism_name = organism
            .and_then(|v| v.get("scientificName"))
            .and_then(|v| v.as_str())
            .ok_or(RejectReason::MalformedEntry("organism.scientificName"))?
            .to_string();
        let lineage = organism
            .and_then(|v| v.get("lineage"))
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();
        let length = entry
            .get("sequence")
            .and_then(|v| v.get("length"))
            .and_then(|v| v.as_u64())
            .filter(|len| *len > 0)
            .ok_or(RejectReason::MalformedEntry("sequence.length"))?;
        let sequence = entry
            .get("sequence")
            .and_then(|v| v.get("value"))
            .and_then(|v| v.as_str())
            .ok_or(RejectReason::MalformedEntry("sequence.value"))?
            .to_string();

        Ok(Self {
            accession,
            organism_name,
            kingdom: Kingdom::from_lineage(&lineage),
            length,
            sequence,
        })
    }

    fn into_extracted(self, label: Label, cleavage_site: u64, n_terminal_tmh: bool) -> Extracted {
        Extracted {
            record: Record {
                accession: self.accession,
                organism_name: self.organism_name,
                kingdom: self.kingdom,
                protein_length: self.length,
                cleavage_site,
                label,
            },
            sequence: self.sequence,
            n_terminal_tmh,
        }
    }
}

// Retrieval already restricts the query to these criteria; only a field that is
// present and contradicts them rejects the entry.
fn check_upstream(
    entry: &Value,
    length: u64,
    min_length: u64,
    require_reviewed: bool,
    require_protein_level: bool,
) -> Result<(), RejectReason> {
    if length < min_length {
        return Err(RejectReason::TooShort { length });
    }
    if require_reviewed {
        let entry_type = entry.get("entryType").and_then(|v| v.as_str());
        if entry_type.is_some_and(|t| t.to_lowercase().contains("unreviewed")) {
            return Err(RejectReason::Unreviewed);
        }
    }
    if require_protein_level {
        let existence = entry.get("proteinExistence").and_then(|v| v.as_str());
        if existence.is_some_and(|e| !e.trim_start().starts_with('1')) {
            return Err(RejectReason::InsufficientEvidence);
        }
    }
    Ok(())
}

fn entry_accession(entry: &Value) -> Option<&str> {
    entry.get("primaryAccession").and_then(|v| v.as_str())
}

fn features(entry: &Value) -> impl Iterator<Item = &Value> {
    entry
        .get("features")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
}

fn feature_type(feature: &Value) -> Option<&str> {
    feature.get("type").and_then(|v| v.as_str())
}

// `None` for a missing coordinate or a placeholder such as "?".
fn location_value(feature: &Value, side: &str) -> Option<u64> {
    feature
        .get("location")
        .and_then(|v| v.get(side))
        .and_then(|v| v.get("value"))
        .and_then(|v| v.as_u64())
}
