use assert_matches::assert_matches;

use signalp_curator::cluster::{ClusterAssignment, ClusterOracle, ClusterTsv, reduce};
use signalp_curator::domain::{Accession, Kingdom, Label, Record};
use signalp_curator::error::CurateError;
use signalp_curator::table::RecordTable;

fn acc(i: usize) -> Accession {
    format!("P{i:05}").parse().unwrap()
}

fn table(n: usize) -> RecordTable {
    let records = (0..n)
        .map(|i| Record {
            accession: acc(i),
            organism_name: "Danio rerio".to_string(),
            kingdom: Kingdom::Metazoa,
            protein_length: 150,
            cleavage_site: 20,
            label: Label::Positive,
        })
        .collect();
    RecordTable::new("fixture", records).unwrap()
}

// Every `stride` consecutive accessions form one cluster led by the first.
fn strided_assignment(n: usize, stride: usize) -> ClusterAssignment {
    ClusterAssignment::from_pairs((0..n).map(|i| (acc(i - i % stride), acc(i)))).unwrap()
}

#[test]
fn output_size_matches_cluster_count() {
    let records = table(60);
    for stride in [1, 2, 3, 7, 60] {
        let assignment = strided_assignment(60, stride);
        let reduced = reduce(&records, &assignment).unwrap();
        assert_eq!(reduced.len(), assignment.len());
        assert_eq!(reduced.len(), 60usize.div_ceil(stride));
        assert!(reduced.iter().all(|r| assignment.is_representative(&r.accession)));
    }
}

#[test]
fn keeps_record_table_order() {
    let records = table(6);
    let assignment = ClusterAssignment::from_pairs([
        (acc(4), acc(4)),
        (acc(4), acc(0)),
        (acc(1), acc(1)),
        (acc(1), acc(5)),
    ])
    .unwrap();
    let reduced = reduce(&records, &assignment).unwrap();
    let kept = reduced.iter().map(|r| r.accession.clone()).collect::<Vec<_>>();
    assert_eq!(kept, vec![acc(1), acc(4)]);
}

#[test]
fn unknown_member_is_integrity_error() {
    let records = table(3);
    let assignment =
        ClusterAssignment::from_pairs([(acc(0), acc(0)), (acc(0), acc(99))]).unwrap();
    let err = reduce(&records, &assignment).unwrap_err();
    assert_matches!(
        err,
        CurateError::Integrity { accession, .. } if accession == "P00099"
    );
}

#[test]
fn tsv_oracle_reads_clustering_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clusters.tsv");
    std::fs::write(&path, "P00000\tP00000\nP00000\tP00001\nP00002\tP00002\n").unwrap();
    let oracle = ClusterTsv::new(camino::Utf8PathBuf::from_path_buf(path).unwrap());

    let records = table(3);
    let assignment = oracle.cluster(&records).unwrap();
    assert_eq!(assignment.len(), 2);
    assert_eq!(reduce(&records, &assignment).unwrap().len(), 2);
}

#[test]
fn missing_cluster_file_is_reported() {
    let oracle = ClusterTsv::new("tests/fixtures/no_clusters.tsv");
    let err = oracle.cluster(&table(1)).unwrap_err();
    assert_matches!(err, CurateError::MissingInput(_));
}
