use std::collections::HashMap;
use std::io::{self, Read, Write};

use bio::io::fasta;

use crate::domain::Accession;
use crate::error::CurateError;

pub const FASTA_LINE_WIDTH: usize = 60;

/// Accession-keyed sequence lookup used by the merge stage.
pub trait SequenceSource {
    fn sequence(&self, accession: &Accession) -> Option<&str>;
}

/// Insertion-ordered accession → sequence map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceMap {
    entries: Vec<(Accession, String)>,
    index: HashMap<Accession, usize>,
}

impl SequenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Ok(false)` when the accession is already present with the same
    /// sequence. A different sequence for a known accession is an error.
    pub fn insert(
        &mut self,
        stage: &'static str,
        accession: Accession,
        sequence: String,
    ) -> Result<bool, CurateError> {
        if let Some(idx) = self.index.get(&accession) {
            if self.entries[*idx].1 != sequence {
                return Err(CurateError::DuplicateAccession {
                    stage,
                    accession: accession.to_string(),
                });
            }
            return Ok(false);
        }
        self.index.insert(accession.clone(), self.entries.len());
        self.entries.push((accession, sequence));
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds every entry of `other`, under the same rules as [`SequenceMap::insert`].
    pub fn extend(&mut self, stage: &'static str, other: SequenceMap) -> Result<(), CurateError> {
        for (accession, sequence) in other.entries {
            self.insert(stage, accession, sequence)?;
        }
        Ok(())
    }

    pub fn read_fasta<R: Read>(reader: R) -> Result<Self, CurateError> {
        let mut map = SequenceMap::new();
        for record in fasta::Reader::new(reader).records() {
            let record = record.map_err(|err| CurateError::Filesystem(err.to_string()))?;
            let sequence = std::str::from_utf8(record.seq())
                .map_err(|err| CurateError::Filesystem(format!("{}: {err}", record.id())))?;
            map.insert("fasta", header_accession(record.id())?, sequence.to_string())?;
        }
        Ok(map)
    }

    pub fn write_fasta<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut writer = fasta::Writer::new(writer);
        for (accession, sequence) in &self.entries {
            // the writer emits the sequence verbatim, so line breaks go in first
            let wrapped = sequence
                .as_bytes()
                .chunks(FASTA_LINE_WIDTH)
                .collect::<Vec<_>>()
                .join(&b'\n');
            writer.write(accession.as_str(), None, &wrapped)?;
        }
        writer.flush()
    }
}

impl SequenceSource for SequenceMap {
    fn sequence(&self, accession: &Accession) -> Option<&str> {
        self.index
            .get(accession)
            .map(|idx| self.entries[*idx].1.as_str())
    }
}

impl SequenceSource for HashMap<Accession, String> {
    fn sequence(&self, accession: &Accession) -> Option<&str> {
        self.get(accession).map(String::as_str)
    }
}

// Accepts bare `P12345` ids as well as `sp|P12345|NAME`.
fn header_accession(id: &str) -> Result<Accession, CurateError> {
    let parts = id.split('|').collect::<Vec<_>>();
    let id = if parts.len() >= 3 { parts[1] } else { id };
    id.parse()
}
