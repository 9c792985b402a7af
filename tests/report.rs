use signalp_curator::domain::{Kingdom, Label, Record};
use signalp_curator::report::{StageCounts, summarize};
use signalp_curator::table::RecordTable;

fn table(prefix: char, n: usize, label: Label) -> RecordTable {
    let records = (0..n)
        .map(|i| Record {
            accession: format!("{prefix}{i:05}").parse().unwrap(),
            organism_name: "Homo sapiens".to_string(),
            kingdom: Kingdom::Metazoa,
            protein_length: 200,
            cleavage_site: if label == Label::Positive { 25 } else { 0 },
            label,
        })
        .collect();
    RecordTable::new("fixture", records).unwrap()
}

#[test]
fn preserves_caller_order_and_counts() {
    let positive = table('P', 2932, Label::Positive);
    let negative = table('Q', 20615, Label::Negative);

    let report = summarize([
        ("Positive (Before Clustering)", &positive),
        ("Negative (Before Clustering)", &negative),
    ]);

    assert_eq!(
        report.stages,
        vec![
            StageCounts {
                stage: "Positive (Before Clustering)".to_string(),
                total: 2932,
                negative: 0,
                positive: 2932,
            },
            StageCounts {
                stage: "Negative (Before Clustering)".to_string(),
                total: 20615,
                negative: 20615,
                positive: 0,
            },
        ]
    );
}

#[test]
fn order_is_not_sorted() {
    let a = table('P', 3, Label::Positive);
    let b = table('Q', 5, Label::Negative);
    let report = summarize([("Zeta", &a), ("Alpha", &b), ("Mid", &a)]);
    let names = report.stages.iter().map(|s| s.stage.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    assert_eq!(report.stage("Alpha").unwrap().negative, 5);
}

#[test]
fn renders_one_line_per_stage() {
    let a = table('P', 3, Label::Positive);
    let report = summarize([("Train", &a), ("Test", &a)]);
    let text = report.to_string();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().nth(2).unwrap().starts_with("| Train"));
    assert!(text.lines().nth(3).unwrap().starts_with("| Test"));
}
