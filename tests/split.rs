use std::collections::HashSet;

use assert_matches::assert_matches;

use signalp_curator::config::SplitConfig;
use signalp_curator::domain::{Kingdom, Label, Partition, Record};
use signalp_curator::error::CurateError;
use signalp_curator::split::{FoldWarning, SplitWarning, assign_folds, split};
use signalp_curator::table::RecordTable;

fn record(i: usize, label: Label) -> Record {
    let prefix = match label {
        Label::Positive => 'P',
        Label::Negative => 'Q',
    };
    Record {
        accession: format!("{prefix}{i:05}").parse().unwrap(),
        organism_name: "Homo sapiens".to_string(),
        kingdom: Kingdom::Metazoa,
        protein_length: 100 + i as u64,
        cleavage_site: if label == Label::Positive { 20 } else { 0 },
        label,
    }
}

fn balanced(n_negative: usize, n_positive: usize) -> RecordTable {
    let records = (0..n_negative)
        .map(|i| record(i, Label::Negative))
        .chain((0..n_positive).map(|i| record(i, Label::Positive)))
        .collect();
    RecordTable::new("fixture", records).unwrap()
}

fn config(train_fraction: f64, k_folds: usize) -> SplitConfig {
    SplitConfig {
        train_fraction,
        k_folds,
        ..SplitConfig::default()
    }
}

#[test]
fn exact_split_keeps_ratio() {
    let table = balanced(50, 50);
    let split = split(&table, &config(0.8, 5)).unwrap();
    assert_eq!(split.train.len(), 80);
    assert_eq!(split.test.len(), 20);
    assert_eq!(split.train.count(Label::Negative), 40);
    assert_eq!(split.train.count(Label::Positive), 40);
    assert_eq!(split.test.count(Label::Negative), 10);
    assert_eq!(split.test.count(Label::Positive), 10);
    assert!(split.warnings.is_empty());
}

#[test]
fn single_row_label_group_drifts_beyond_tolerance() {
    let table = balanced(10, 1);
    let split = split(&table, &config(0.8, 5)).unwrap();
    assert_eq!(split.train.count(Label::Positive), 0);
    assert_eq!(split.test.count(Label::Positive), 1);

    let drifted = split
        .warnings
        .iter()
        .map(|SplitWarning::RatioDrift { partition, .. }| *partition)
        .collect::<Vec<_>>();
    assert_eq!(drifted, vec![Partition::Train, Partition::Test]);
}

#[test]
fn wide_tolerance_accepts_drift() {
    let table = balanced(10, 1);
    let cfg = SplitConfig {
        ratio_tolerance: 0.5,
        ..config(0.8, 5)
    };
    assert!(split(&table, &cfg).unwrap().warnings.is_empty());
}

#[test]
fn split_is_a_partition() {
    let table = balanced(37, 23);
    let split = split(&table, &config(0.8, 5)).unwrap();
    let train = split.train.iter().map(|r| &r.accession).collect::<HashSet<_>>();
    let test = split.test.iter().map(|r| &r.accession).collect::<HashSet<_>>();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), table.len());
    assert!(table.iter().all(|r| train.contains(&r.accession) || test.contains(&r.accession)));
}

#[test]
fn non_exact_split_floors_train_count() {
    let table = balanced(0, 7);
    let split = split(&table, &config(0.8, 5)).unwrap();
    assert_eq!(split.train.len(), 5);
    assert_eq!(split.test.len(), 2);
}

#[test]
fn split_and_folds_are_reproducible() {
    let table = balanced(43, 29);
    let cfg = config(0.8, 5);

    let render = || {
        let split = split(&table, &cfg).unwrap();
        let folds = assign_folds(&split.train, &cfg).unwrap();
        let mut train = Vec::new();
        folds.write_tsv(&mut train).unwrap();
        let mut test = Vec::new();
        split.test.write_tsv(&mut test, true).unwrap();
        (train, test)
    };

    assert_eq!(render(), render());
}

#[test]
fn seed_changes_the_split() {
    let table = balanced(50, 50);
    let a = split(&table, &config(0.8, 5)).unwrap();
    let b = split(
        &table,
        &SplitConfig {
            seed: 7,
            ..config(0.8, 5)
        },
    )
    .unwrap();
    assert_ne!(a.test, b.test);
}

#[test]
fn label_interleaving_does_not_change_split() {
    let grouped = balanced(30, 30);
    let interleaved = RecordTable::new(
        "fixture",
        (0..30)
            .flat_map(|i| [record(i, Label::Positive), record(i, Label::Negative)])
            .collect(),
    )
    .unwrap();

    let cfg = config(0.8, 5);
    let a = split(&grouped, &cfg).unwrap();
    let b = split(&interleaved, &cfg).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        assign_folds(&a.train, &cfg).unwrap(),
        assign_folds(&b.train, &cfg).unwrap()
    );
}

#[test]
fn exact_folds_are_stratified() {
    let train = balanced(50, 50);
    let folds = assign_folds(&train, &config(0.8, 5)).unwrap();
    assert_eq!(folds.fold_sizes(), vec![20; 5]);
    assert_eq!(folds.fold_label_counts(Label::Negative), vec![10; 5]);
    assert_eq!(folds.fold_label_counts(Label::Positive), vec![10; 5]);
    assert!(folds.warnings.is_empty());
    let counts = folds.fold_counts();
    assert_eq!(counts.len(), 5);
    assert!(
        counts
            .iter()
            .enumerate()
            .all(|(idx, c)| c.fold == idx && c.negative == 10 && c.positive == 10)
    );
}

#[test]
fn fold_sizes_differ_by_at_most_one() {
    let spread = |counts: &[usize]| {
        counts.iter().max().unwrap() - counts.iter().min().unwrap()
    };
    for k in 2..=7 {
        for n_negative in [0, 1, 3, 17, 50] {
            for n_positive in [0, 2, 9, 33] {
                let train = balanced(n_negative, n_positive);
                let folds = assign_folds(&train, &config(0.8, k)).unwrap();
                assert_eq!(folds.len(), n_negative + n_positive);
                assert!(spread(&folds.fold_sizes()) <= 1, "k={k} n={n_negative}/{n_positive}");
                assert!(spread(&folds.fold_label_counts(Label::Negative)) <= 1);
                assert!(spread(&folds.fold_label_counts(Label::Positive)) <= 1);
                assert!(folds.rows.iter().all(|row| row.fold < k));
            }
        }
    }
}

#[test]
fn sparse_label_is_warned() {
    let train = balanced(50, 3);
    let folds = assign_folds(&train, &config(0.8, 5)).unwrap();
    assert_eq!(
        folds.warnings,
        vec![FoldWarning::SparseLabel {
            label: Label::Positive,
            count: 3,
            k_folds: 5,
        }]
    );
    assert!(folds.fold_label_counts(Label::Positive).contains(&0));
}

#[test]
fn invalid_parameters_are_rejected() {
    let table = balanced(10, 10);
    assert_matches!(
        split(&table, &config(1.0, 5)),
        Err(CurateError::InvalidSplit(_))
    );
    assert_matches!(
        assign_folds(&table, &config(0.8, 1)),
        Err(CurateError::InvalidSplit(_))
    );
}
