use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};

use camino::Utf8Path;
use serde::Deserialize;

use crate::domain::{Accession, Label, Record};
use crate::error::CurateError;

pub const BASE_COLUMNS: [&str; 5] = [
    "accession",
    "organism_name",
    "kingdom",
    "protein_length",
    "cleavage_site",
];

/// Label-tagged rows keyed by unique accession, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    records: Vec<Record>,
    index: HashMap<Accession, usize>,
}

impl RecordTable {
    pub fn new(stage: &'static str, records: Vec<Record>) -> Result<Self, CurateError> {
        let mut table = Self::default();
        for record in records {
            table.push(stage, record)?;
        }
        Ok(table)
    }

    pub fn push(&mut self, stage: &'static str, record: Record) -> Result<(), CurateError> {
        if self.index.contains_key(&record.accession) {
            return Err(CurateError::DuplicateAccession {
                stage,
                accession: record.accession.to_string(),
            });
        }
        self.index
            .insert(record.accession.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn contains(&self, accession: &Accession) -> bool {
        self.index.contains_key(accession)
    }

    pub fn count(&self, label: Label) -> usize {
        self.records.iter().filter(|r| r.label == label).count()
    }

    /// Reads a tab-separated table with a header row. Rows without a `label`
    /// column take `label`; rows that carry one must agree with it.
    pub fn read_tsv(path: &Utf8Path, label: Label) -> Result<Self, CurateError> {
        Self::from_reader(open_table(path)?, Some(label), path.as_str())
    }

    /// Reads a table whose rows carry their own `label` column.
    pub fn read_labelled_tsv(path: &Utf8Path) -> Result<Self, CurateError> {
        Self::from_reader(open_table(path)?, None, path.as_str())
    }

    pub fn from_reader<R: Read>(
        reader: R,
        expected: Option<Label>,
        source: &str,
    ) -> Result<Self, CurateError> {
        let parse_err = |message: String| CurateError::TableParse {
            path: source.to_string(),
            message,
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(reader);

        let mut table = RecordTable::default();
        for row in reader.deserialize::<TsvRow>() {
            let row = row.map_err(|err| parse_err(err.to_string()))?;
            let accession: Accession = row.accession.parse()?;
            let found = match row.label.as_deref().filter(|v| !v.is_empty()) {
                Some(value) => Some(value.parse::<Label>()?),
                None => None,
            };
            let label = match (expected, found) {
                (Some(expected), Some(found)) if expected != found => {
                    return Err(CurateError::LabelMismatch {
                        accession: accession.to_string(),
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
                (_, Some(found)) => found,
                (Some(expected), None) => expected,
                (None, None) => {
                    return Err(parse_err(format!("row {accession} has no label")));
                }
            };
            table.push(
                "table read",
                Record {
                    accession,
                    organism_name: row.organism_name,
                    kingdom: row.kingdom.parse()?,
                    protein_length: row.protein_length,
                    cleavage_site: row.cleavage_site,
                    label,
                },
            )?;
        }
        Ok(table)
    }

    pub fn write_tsv<W: Write>(&self, writer: W, with_label: bool) -> Result<(), CurateError> {
        let mut writer = tsv_writer(writer);
        let mut header = BASE_COLUMNS.to_vec();
        if with_label {
            header.push("label");
        }
        write_row(&mut writer, &header)?;
        for record in &self.records {
            let mut row = base_fields(record).to_vec();
            if with_label {
                row.push(record.label.to_string());
            }
            write_row(&mut writer, &row)?;
        }
        writer
            .flush()
            .map_err(|err| CurateError::Filesystem(err.to_string()))
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn open_table(path: &Utf8Path) -> Result<File, CurateError> {
    if !path.as_std_path().exists() {
        return Err(CurateError::MissingInput(path.as_std_path().to_path_buf()));
    }
    File::open(path.as_std_path())
        .map_err(|err| CurateError::Filesystem(format!("open {path}: {err}")))
}

#[derive(Debug, Deserialize)]
struct TsvRow {
    accession: String,
    organism_name: String,
    kingdom: String,
    protein_length: u64,
    cleavage_site: u64,
    #[serde(default)]
    label: Option<String>,
}

pub(crate) fn base_fields(record: &Record) -> [String; 5] {
    [
        record.accession.to_string(),
        record.organism_name.clone(),
        record.kingdom.to_string(),
        record.protein_length.to_string(),
        record.cleavage_site.to_string(),
    ]
}

pub(crate) fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer)
}

pub(crate) fn write_row<W: Write, S: AsRef<[u8]>>(
    writer: &mut csv::Writer<W>,
    fields: &[S],
) -> Result<(), CurateError> {
    writer
        .write_record(fields)
        .map_err(|err| CurateError::Filesystem(err.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::Kingdom;

    fn record(acc: &str, label: Label) -> Record {
        Record {
            accession: acc.parse().unwrap(),
            organism_name: "Homo sapiens".to_string(),
            kingdom: Kingdom::Metazoa,
            protein_length: 120,
            cleavage_site: if label == Label::Positive { 22 } else { 0 },
            label,
        }
    }

    #[test]
    fn rejects_duplicate_accession() {
        let err = RecordTable::new(
            "test",
            vec![record("P12345", Label::Positive), record("P12345", Label::Positive)],
        )
        .unwrap_err();
        assert_matches!(err, CurateError::DuplicateAccession { .. });
    }

    #[test]
    fn tsv_round_trip_keeps_order_and_fields() {
        let table = RecordTable::new(
            "test",
            vec![record("Q11111", Label::Positive), record("P22222", Label::Positive)],
        )
        .unwrap();
        let mut out = Vec::new();
        table.write_tsv(&mut out, false).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("accession\torganism_name\tkingdom\tprotein_length\tcleavage_site\n"));

        let back = RecordTable::from_reader(out.as_slice(), Some(Label::Positive), "mem").unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn label_column_must_agree() {
        let text = "accession\torganism_name\tkingdom\tprotein_length\tcleavage_site\tlabel\n\
                    P12345\tHomo sapiens\tMetazoa\t100\t0\t0\n";
        let err = RecordTable::from_reader(text.as_bytes(), Some(Label::Positive), "mem").unwrap_err();
        assert_matches!(err, CurateError::LabelMismatch { .. });
    }
}
