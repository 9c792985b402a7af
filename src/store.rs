use std::fs::{self, File};
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::Label;
use crate::error::CurateError;
use crate::sequences::SequenceMap;

/// File layout of one curation run inside its output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), CurateError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| CurateError::Filesystem(err.to_string()))
    }

    pub fn extracted_table_path(&self, label: Label) -> Utf8PathBuf {
        self.root.join(format!("{}.tsv", label.name()))
    }

    pub fn fasta_path(&self, label: Label) -> Utf8PathBuf {
        self.root.join(format!("{}.fasta", label.name()))
    }

    pub fn cluster_path(&self, label: Label) -> Utf8PathBuf {
        self.root.join(format!("{}_clusters.tsv", label.name()))
    }

    pub fn filtered_table_path(&self, label: Label) -> Utf8PathBuf {
        self.root.join(format!("filtered_{}.tsv", label.name()))
    }

    pub fn tally_path(&self, label: Label) -> Utf8PathBuf {
        self.root.join(format!("{}_extraction.json", label.name()))
    }

    pub fn train_path(&self) -> Utf8PathBuf {
        self.root.join("train.tsv")
    }

    pub fn test_path(&self) -> Utf8PathBuf {
        self.root.join("test.tsv")
    }

    pub fn merged_path(&self) -> Utf8PathBuf {
        self.root.join("merged.tsv")
    }

    pub fn summary_path(&self) -> Utf8PathBuf {
        self.root.join("summary.json")
    }

    pub fn read_fasta(path: &Utf8Path) -> Result<SequenceMap, CurateError> {
        if !path.as_std_path().exists() {
            return Err(CurateError::MissingInput(path.as_std_path().to_path_buf()));
        }
        let file = File::open(path.as_std_path())
            .map_err(|err| CurateError::Filesystem(format!("open {path}: {err}")))?;
        SequenceMap::read_fasta(file)
    }

    /// Writes through a temporary file in the destination directory and moves
    /// it into place once `write` succeeded.
    pub fn write_atomic<F>(path: &Utf8Path, write: F) -> Result<(), CurateError>
    where
        F: FnOnce(&mut BufWriter<&File>) -> Result<(), CurateError>,
    {
        let parent = path
            .parent()
            .ok_or_else(|| CurateError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| CurateError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix(".sp-curate")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CurateError::Filesystem(err.to_string()))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            write(&mut writer)?;
            writer
                .flush()
                .map_err(|err| CurateError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| CurateError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_json<T: serde::Serialize>(path: &Utf8Path, value: &T) -> Result<(), CurateError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| CurateError::Filesystem(err.to_string()))?;
        Self::write_atomic(path, |writer| {
            writer
                .write_all(&content)
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|err| CurateError::Filesystem(err.to_string()))
        })
    }
}
