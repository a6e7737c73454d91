use bincode::{deserialize, serialize};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::tables::Tables;

/// On-disk snapshot of the local store.
///
/// Binary format (bincode) with gzip compression, written atomically.
pub struct SnapshotStorage {
    path: PathBuf,
    use_compression: bool,
}

impl SnapshotStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_compression: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load tables from disk. A missing file yields empty tables; an
    /// unreadable one is backed up next to the original and replaced by
    /// empty tables.
    pub fn load(&self) -> Result<Tables, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Store snapshot does not exist, starting empty");
            return Ok(Tables::new());
        }

        let start = std::time::Instant::now();
        let data = std::fs::read(&self.path)?;

        let decoded = if self.use_compression {
            let mut decoder = GzDecoder::new(&data[..]);
            let mut decompressed = Vec::new();
            match decoder.read_to_end(&mut decompressed) {
                Ok(_) => decompressed,
                Err(e) => return Ok(self.start_fresh(&e.to_string())),
            }
        } else {
            data
        };

        let tables: Tables = match deserialize(&decoded) {
            Ok(tables) => tables,
            Err(e) => return Ok(self.start_fresh(&e.to_string())),
        };

        info!(
            shows = tables.my_shows.len(),
            movies = tables.my_movies.len(),
            ratings = tables.ratings.len(),
            lists = tables.custom_lists.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded store snapshot"
        );
        Ok(tables)
    }

    fn start_fresh(&self, error: &str) -> Tables {
        let backup_path = self.path.with_extension("bin.bak");
        if let Err(backup_err) = std::fs::copy(&self.path, &backup_path) {
            warn!(
                "Failed to back up incompatible store snapshot: {}. Starting with an empty store.",
                backup_err
            );
        } else {
            warn!(
                "Store snapshot incompatible (error: {}). Backed up to {:?} and starting with an empty store.",
                error, backup_path
            );
        }
        Tables::new()
    }

    /// Write tables to disk: temp file, then rename.
    pub fn save(&self, tables: &Tables) -> Result<(), StoreError> {
        let start = std::time::Instant::now();
        let serialized = serialize(tables)?;

        let encoded = if self.use_compression {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&serialized)?;
            encoder.finish()?
        } else {
            serialized
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, encoded)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!(
            path = %self.path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Saved store snapshot"
        );
        Ok(())
    }

    pub fn size(&self) -> Result<u64, StoreError> {
        if self.path.exists() {
            Ok(std::fs::metadata(&self.path)?.len())
        } else {
            Ok(0)
        }
    }

    pub fn set_compression(&mut self, use_compression: bool) {
        self.use_compression = use_compression;
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
