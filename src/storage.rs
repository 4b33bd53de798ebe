//! JSON snapshots of the whole ledger, so the CLI can apply one transition per run.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::config::ConfigValidator;
use crate::oracle::IndexSource;
use crate::surety::{FlightSurety, SuretySnapshot, SNAPSHOT_VERSION};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No ledger state at {0}; run `init` first")]
    Missing(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed ledger state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Ledger state carries invalid parameters:\n{0}")]
    InvalidParameters(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}

/// A ledger snapshot file on disk
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write the ledger state. The file is replaced atomically.
    pub fn save(&self, surety: &FlightSurety) -> Result<(), StorageError> {
        let snapshot = surety.snapshot();
        let staging = self.path.with_extension("tmp");

        let file = File::create(&staging).map_err(io_err(&staging))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush().map_err(io_err(&staging))?;
        drop(writer);
        fs::rename(&staging, &self.path).map_err(io_err(&self.path))?;

        info!(
            "Saved ledger at height {} to {}",
            snapshot.block.height,
            self.path.display()
        );
        Ok(())
    }

    pub fn load_snapshot(&self) -> Result<SuretySnapshot, StorageError> {
        if !self.exists() {
            return Err(StorageError::Missing(self.path.clone()));
        }
        let file = File::open(&self.path).map_err(io_err(&self.path))?;
        let snapshot: SuretySnapshot = serde_json::from_reader(BufReader::new(file))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let validation = ConfigValidator::new().validate(&snapshot.parameters);
        if !validation.is_valid {
            return Err(StorageError::InvalidParameters(validation.get_summary()));
        }
        debug!(
            "Loaded snapshot from {} at height {}",
            self.path.display(),
            snapshot.block.height
        );
        Ok(snapshot)
    }

    pub fn load(&self, index_source: Box<dyn IndexSource>) -> Result<FlightSurety, StorageError> {
        Ok(FlightSurety::restore(self.load_snapshot()?, index_source))
    }
}
