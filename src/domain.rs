use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CurateError;

fn accession_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[OPQ][0-9][A-Z0-9]{3}[0-9]|[A-NR-Z][0-9](?:[A-Z][A-Z0-9]{2}[0-9]){1,2})$")
            .expect("static accession pattern")
    })
}

/// UniProtKB primary accession.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = CurateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !accession_pattern().is_match(&normalized) {
            return Err(CurateError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kingdom {
    Metazoa,
    Fungi,
    Plants,
    Other,
}

impl Kingdom {
    /// Coarse eukaryotic grouping from an ordered taxonomic lineage.
    ///
    /// Metazoa wins over Fungi, which wins over Viridiplantae; anything else is `Other`.
    pub fn from_lineage<S: AsRef<str>>(lineage: &[S]) -> Self {
        let contains = |name: &str| lineage.iter().any(|taxon| taxon.as_ref() == name);
        if contains("Metazoa") {
            Kingdom::Metazoa
        } else if contains("Fungi") {
            Kingdom::Fungi
        } else if contains("Viridiplantae") {
            Kingdom::Plants
        } else {
            Kingdom::Other
        }
    }
}

impl fmt::Display for Kingdom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kingdom::Metazoa => write!(f, "Metazoa"),
            Kingdom::Fungi => write!(f, "Fungi"),
            Kingdom::Plants => write!(f, "Plants"),
            Kingdom::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for Kingdom {
    type Err = CurateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Metazoa" => Ok(Kingdom::Metazoa),
            "Fungi" => Ok(Kingdom::Fungi),
            "Plants" => Ok(Kingdom::Plants),
            "Other" => Ok(Kingdom::Other),
            _ => Err(CurateError::InvalidKingdom(value.to_string())),
        }
    }
}

/// Class label. Ordering puts negatives first, which is also the
/// concatenation order of split outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Label::Negative => "negative",
            Label::Positive => "positive",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl FromStr for Label {
    type Err = CurateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "0" | "negative" => Ok(Label::Negative),
            "1" | "positive" => Ok(Label::Positive),
            _ => Err(CurateError::InvalidLabel(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Test,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Train => write!(f, "train"),
            Partition::Test => write!(f, "test"),
        }
    }
}

/// One curated protein.
///
/// `cleavage_site` is the signal peptide length for positives and 0 otherwise.
/// Sequences live apart from records and are joined in at the merge stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub accession: Accession,
    pub organism_name: String,
    pub kingdom: Kingdom,
    pub protein_length: u64,
    pub cleavage_site: u64,
    pub label: Label,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_accession_normalizes_case() {
        let acc: Accession = " p69905 ".parse().unwrap();
        assert_eq!(acc.as_str(), "P69905");
    }

    #[test]
    fn parse_accession_accepts_ten_character_form() {
        let acc: Accession = "A0A023GPI8".parse().unwrap();
        assert_eq!(acc.as_str(), "A0A023GPI8");
    }

    #[test]
    fn parse_accession_invalid() {
        let err = "sp|P69905|HBA".parse::<Accession>().unwrap_err();
        assert_matches!(err, CurateError::InvalidAccession(_));
    }

    #[test]
    fn kingdom_precedence() {
        assert_eq!(
            Kingdom::from_lineage(&["Eukaryota", "Opisthokonta", "Metazoa"]),
            Kingdom::Metazoa
        );
        assert_eq!(
            Kingdom::from_lineage(&["Eukaryota", "Opisthokonta", "Fungi"]),
            Kingdom::Fungi
        );
        assert_eq!(
            Kingdom::from_lineage(&["Eukaryota", "Viridiplantae"]),
            Kingdom::Plants
        );
        assert_eq!(Kingdom::from_lineage::<&str>(&[]), Kingdom::Other);
    }

    #[test]
    fn label_round_trips_through_text() {
        assert_eq!("1".parse::<Label>().unwrap(), Label::Positive);
        assert_eq!("negative".parse::<Label>().unwrap(), Label::Negative);
        assert_eq!(Label::Positive.to_string(), "1");
        assert_matches!("2".parse::<Label>(), Err(CurateError::InvalidLabel(_)));
    }
}
