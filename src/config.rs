use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CurateError;

pub const DEFAULT_CONFIG_FILE: &str = "sp-curate.json";
pub const MAX_K_FOLDS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub split: SplitConfig,
}

/// Predicate sets for both classes. They share no code path: each class is
/// filtered only by its own criteria.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub positive: PositiveCriteria,
    #[serde(default)]
    pub negative: NegativeCriteria,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PositiveCriteria {
    pub feature_type: String,
    pub min_signal_length: u64,
    pub min_protein_length: u64,
    pub require_reviewed: bool,
    pub require_protein_level: bool,
}

impl Default for PositiveCriteria {
    fn default() -> Self {
        Self {
            feature_type: "Signal".to_string(),
            min_signal_length: 14,
            min_protein_length: 40,
            require_reviewed: true,
            require_protein_level: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NegativeCriteria {
    pub min_protein_length: u64,
    pub require_reviewed: bool,
    pub require_protein_level: bool,
    /// Entries carrying this feature belong to the other class.
    pub excluded_feature_type: String,
    pub tmh_feature_type: String,
    pub tmh_window: u64,
}

impl Default for NegativeCriteria {
    fn default() -> Self {
        Self {
            min_protein_length: 40,
            require_reviewed: true,
            require_protein_level: true,
            excluded_feature_type: "Signal".to_string(),
            tmh_feature_type: "Transmembrane".to_string(),
            tmh_window: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_fraction: f64,
    pub k_folds: usize,
    pub seed: u64,
    /// Allowed difference between a subset's positive fraction and the source's.
    pub ratio_tolerance: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            k_folds: 5,
            seed: 42,
            ratio_tolerance: 0.05,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), CurateError> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(CurateError::InvalidSplit(format!(
                "train_fraction {} is outside (0, 1)",
                self.train_fraction
            )));
        }
        if !(2..=MAX_K_FOLDS).contains(&self.k_folds) {
            return Err(CurateError::InvalidSplit(format!(
                "k_folds {} is outside [2, {MAX_K_FOLDS}]",
                self.k_folds
            )));
        }
        if !(0.0..=1.0).contains(&self.ratio_tolerance) {
            return Err(CurateError::InvalidSplit(format!(
                "ratio_tolerance {} is outside [0, 1]",
                self.ratio_tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub extraction: ExtractionConfig,
    pub split: SplitConfig,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            extraction: ExtractionConfig::default(),
            split: SplitConfig::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the given file, or `sp-curate.json` in the working directory.
    /// Without an explicit path a missing default file means built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CurateError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CurateError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CurateError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CurateError> {
        config.split.validate()?;
        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            extraction: config.extraction,
            split: config.split,
        })
    }
}
