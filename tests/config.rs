use std::fs;

use assert_matches::assert_matches;

use signalp_curator::config::ConfigLoader;
use signalp_curator::error::CurateError;

#[test]
fn loads_file_and_fills_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("sp-curate.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "extraction": { "negative": { "tmh_window": 50 } },
            "split": { "seed": 7, "k_folds": 10 }
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.split.seed, 7);
    assert_eq!(config.split.k_folds, 10);
    assert_eq!(config.split.train_fraction, 0.8);
    assert_eq!(config.extraction.negative.tmh_window, 50);
    assert_eq!(config.extraction.positive.feature_type, "Signal");
}

#[test]
fn malformed_file_is_a_parse_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.json");
    fs::write(&path, "{ \"split\": ").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CurateError::ConfigParse(_))
    );
}

#[test]
fn explicit_missing_file_is_a_read_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CurateError::ConfigRead(_))
    );
}

#[test]
fn out_of_range_fraction_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bad.json");
    fs::write(&path, r#"{ "split": { "train_fraction": 1.5 } }"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CurateError::InvalidSplit(_))
    );
}
