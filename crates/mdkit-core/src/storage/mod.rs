//! Durable artifact storage for simulation outputs.
//!
//! Outputs produced inside a transient working directory must outlive it, so
//! the pipeline hands them to an [`ArtifactStore`] before the directory is
//! released. The store owns the id-to-path mapping; callers only keep ids.

use crate::domain::{SimError, SimResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

const ID_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const ID_PRIME: u64 = 0x0000_0100_0000_01B3;

/// A relocated artifact: the fresh id and where it now lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub id: String,
    pub path: PathBuf,
}

/// Seam between the pipeline and durable storage.
pub trait ArtifactStore {
    /// Copy `source` into durable storage under a fresh id, named
    /// `<label>_<id>.<extension>`.
    fn store(&self, label: &str, extension: &str, source: &Path) -> SimResult<StoredArtifact>;

    /// Path of a previously stored artifact, if the id is known.
    fn resolve(&self, id: &str) -> Option<PathBuf>;
}

/// Filesystem-backed store keeping its registry in process memory.
pub struct FsArtifactStore {
    directory: PathBuf,
    registry: Mutex<HashMap<String, PathBuf>>,
}

impl FsArtifactStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            registry: Mutex::new(HashMap::new()),
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn store(&self, label: &str, extension: &str, source: &Path) -> SimResult<StoredArtifact> {
        fs::create_dir_all(&self.directory).map_err(|error| {
            SimError::io_system(
                "IO.STORAGE_DIR",
                format!(
                    "failed to create storage directory '{}': {}",
                    self.directory.display(),
                    error
                ),
            )
        })?;

        let id = fresh_id();
        let path = self.directory.join(format!("{label}_{id}.{extension}"));
        fs::copy(source, &path).map_err(|error| {
            SimError::io_system(
                "IO.ARTIFACT_COPY",
                format!(
                    "failed to store '{}' as '{}': {}",
                    source.display(),
                    path.display(),
                    error
                ),
            )
        })?;

        info!(%id, path = %path.display(), "stored artifact");
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| SimError::internal("INTERNAL.REGISTRY", "artifact registry poisoned"))?;
        registry.insert(id.clone(), path.clone());

        Ok(StoredArtifact { id, path })
    }

    fn resolve(&self, id: &str) -> Option<PathBuf> {
        self.registry.lock().ok()?.get(id).cloned()
    }
}

/// Collision-resistant short id from the process id and the current time,
/// mixed through FNV-1a.
pub fn fresh_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0);

    let mut hash = ID_OFFSET_BASIS;
    for byte in process::id()
        .to_le_bytes()
        .into_iter()
        .chain(nanos.to_le_bytes())
    {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(ID_PRIME);
    }
    format!("{:08x}", (hash >> 32) as u32 ^ hash as u32)
}
