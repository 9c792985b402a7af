use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use camino::Utf8PathBuf;

use crate::domain::Accession;
use crate::error::CurateError;
use crate::table::RecordTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub representative: Accession,
    pub members: Vec<Accession>,
}

/// Accession → cluster mapping from one clustering run. Clusters keep the
/// order in which their representative first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterAssignment {
    clusters: Vec<Cluster>,
    member_of: HashMap<Accession, usize>,
}

impl ClusterAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member` to the cluster led by `representative`, creating it on
    /// first sight. A representative always belongs to its own cluster.
    pub fn assign(
        &mut self,
        representative: Accession,
        member: Accession,
    ) -> Result<(), CurateError> {
        let cluster_idx = match self.member_of.get(&representative).copied() {
            Some(idx) if self.clusters[idx].representative == representative => idx,
            Some(_) => {
                return Err(CurateError::ConflictingCluster {
                    accession: representative.to_string(),
                });
            }
            None => {
                let idx = self.clusters.len();
                self.member_of.insert(representative.clone(), idx);
                self.clusters.push(Cluster {
                    representative: representative.clone(),
                    members: vec![representative],
                });
                idx
            }
        };

        match self.member_of.get(&member).copied() {
            Some(idx) if idx == cluster_idx => Ok(()),
            Some(_) => Err(CurateError::ConflictingCluster {
                accession: member.to_string(),
            }),
            None => {
                self.member_of.insert(member.clone(), cluster_idx);
                self.clusters[cluster_idx].members.push(member);
                Ok(())
            }
        }
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, CurateError>
    where
        I: IntoIterator<Item = (Accession, Accession)>,
    {
        let mut assignment = Self::new();
        for (representative, member) in pairs {
            assignment.assign(representative, member)?;
        }
        Ok(assignment)
    }

    /// Two tab-separated columns, representative then member, no header.
    pub fn read_tsv<R: Read>(reader: R) -> Result<Self, CurateError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut assignment = Self::new();
        for row in reader.deserialize::<(String, String)>() {
            let (representative, member) = row.map_err(|err| CurateError::TableParse {
                path: "cluster assignment".to_string(),
                message: err.to_string(),
            })?;
            assignment.assign(representative.parse()?, member.parse()?)?;
        }
        Ok(assignment)
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn representative_of(&self, accession: &Accession) -> Option<&Accession> {
        self.member_of
            .get(accession)
            .map(|idx| &self.clusters[*idx].representative)
    }

    pub fn is_representative(&self, accession: &Accession) -> bool {
        self.representative_of(accession) == Some(accession)
    }

    pub fn members(&self) -> impl Iterator<Item = &Accession> {
        self.clusters.iter().flat_map(|c| c.members.iter())
    }
}

/// Source of a cluster assignment for one label-homogeneous table.
pub trait ClusterOracle {
    fn cluster(&self, table: &RecordTable) -> Result<ClusterAssignment, CurateError>;
}

impl ClusterOracle for ClusterAssignment {
    fn cluster(&self, _table: &RecordTable) -> Result<ClusterAssignment, CurateError> {
        Ok(self.clone())
    }
}

/// Cluster table written by an external similarity clustering run.
#[derive(Debug, Clone)]
pub struct ClusterTsv {
    path: Utf8PathBuf,
}

impl ClusterTsv {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClusterOracle for ClusterTsv {
    fn cluster(&self, _table: &RecordTable) -> Result<ClusterAssignment, CurateError> {
        if !self.path.as_std_path().exists() {
            return Err(CurateError::MissingInput(self.path.as_std_path().to_path_buf()));
        }
        let file = File::open(self.path.as_std_path())
            .map_err(|err| CurateError::Filesystem(format!("open {}: {err}", self.path)))?;
        ClusterAssignment::read_tsv(file)
    }
}

/// Keeps one row per cluster: the representative's.
///
/// Every accession named by the assignment must exist in `records`. Rows the
/// assignment never mentions are dropped.
pub fn reduce(
    records: &RecordTable,
    clusters: &ClusterAssignment,
) -> Result<RecordTable, CurateError> {
    if let Some(missing) = clusters.members().find(|acc| !records.contains(acc)) {
        return Err(CurateError::Integrity {
            stage: "cluster reduction",
            accession: missing.to_string(),
        });
    }

    let mut reduced = RecordTable::default();
    let mut unclustered = 0usize;
    for record in records {
        match clusters.representative_of(&record.accession) {
            Some(rep) if *rep == record.accession => {
                reduced.push("cluster reduction", record.clone())?;
            }
            Some(_) => {}
            None => unclustered += 1,
        }
    }
    if unclustered > 0 {
        tracing::warn!(
            unclustered,
            "records absent from the cluster assignment were dropped"
        );
    }
    tracing::info!(
        before = records.len(),
        after = reduced.len(),
        "cluster reduction finished"
    );
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn acc(value: &str) -> Accession {
        value.parse().unwrap()
    }

    #[test]
    fn representative_is_member_of_own_cluster() {
        let assignment =
            ClusterAssignment::from_pairs([(acc("P11111"), acc("P22222"))]).unwrap();
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.clusters()[0].members.len(), 2);
        assert!(assignment.is_representative(&acc("P11111")));
        assert!(!assignment.is_representative(&acc("P22222")));
    }

    #[test]
    fn member_in_two_clusters_conflicts() {
        let err = ClusterAssignment::from_pairs([
            (acc("P11111"), acc("P33333")),
            (acc("P22222"), acc("P33333")),
        ])
        .unwrap_err();
        assert_matches!(err, CurateError::ConflictingCluster { .. });
    }

    #[test]
    fn member_cannot_lead_another_cluster() {
        let err = ClusterAssignment::from_pairs([
            (acc("P11111"), acc("P22222")),
            (acc("P22222"), acc("P33333")),
        ])
        .unwrap_err();
        assert_matches!(err, CurateError::ConflictingCluster { .. });
    }

    #[test]
    fn read_tsv_groups_rows_by_representative() {
        let text = "P11111\tP11111\nP11111\tP22222\nQ33333\tQ33333\n";
        let assignment = ClusterAssignment::read_tsv(text.as_bytes()).unwrap();
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.representative_of(&acc("P22222")), Some(&acc("P11111")));
    }

    #[test]
    fn read_tsv_skips_blank_lines_and_trims() {
        let text = "P11111\t P22222 \n\nP11111\tP11111\n";
        let assignment = ClusterAssignment::read_tsv(text.as_bytes()).unwrap();
        assert_eq!(assignment.len(), 1);
        assert!(assignment.is_representative(&acc("P11111")));
    }

    #[test]
    fn read_tsv_rejects_single_column_rows() {
        let err = ClusterAssignment::read_tsv("P11111\n".as_bytes()).unwrap_err();
        assert_matches!(err, CurateError::TableParse { .. });
    }
}
