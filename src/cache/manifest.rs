//! Sidecar manifests that decide whether a historical artifact can be reused.
//!
//! An artifact is fresh only when its manifest exists and records the same [`CacheKey`]
//! the artifact would be built with now: every upstream file with its length and
//! modification time, plus the parameters the build depends on. A bare artifact with
//! no manifest is always rebuilt.

use crate::cache::error::CacheError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const MANIFEST_SUFFIX: &str = "manifest.json";

/// Identity of an upstream file at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamFingerprint {
    pub len: u64,
    pub modified_ms: u64,
}

impl UpstreamFingerprint {
    pub fn of(path: &Path) -> Result<Self, CacheError> {
        let metadata =
            std::fs::metadata(path).map_err(|e| CacheError::MetadataRead(path.to_path_buf(), e))?;
        let modified = metadata
            .modified()
            .map_err(|e| CacheError::MetadataRead(path.to_path_buf(), e))?;
        let modified_ms = modified
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CacheError::SystemTimeCalculation(path.to_path_buf(), e))?
            .as_millis() as u64;
        Ok(Self {
            len: metadata.len(),
            modified_ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRecord {
    pub path: PathBuf,
    pub fingerprint: UpstreamFingerprint,
}

/// Everything an artifact's content depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub upstreams: Vec<UpstreamRecord>,
    pub parameters: BTreeMap<String, String>,
}

impl CacheKey {
    /// Fingerprints every upstream file as it is now.
    pub fn of_upstreams(upstreams: &[&Path]) -> Result<Self, CacheError> {
        let upstreams = upstreams
            .iter()
            .map(|path| {
                Ok(UpstreamRecord {
                    path: path.to_path_buf(),
                    fingerprint: UpstreamFingerprint::of(path)?,
                })
            })
            .collect::<Result<Vec<_>, CacheError>>()?;
        Ok(Self {
            upstreams,
            parameters: BTreeMap::new(),
        })
    }

    pub fn with_parameter(mut self, name: &str, value: impl ToString) -> Self {
        self.parameters.insert(name.to_string(), value.to_string());
        self
    }
}

/// What was used to build an artifact, and what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub key: CacheKey,
    pub rows: usize,
    pub first_time: Option<String>,
    pub last_time: Option<String>,
}

/// `london_PM25_hist_data_w_label.csv` → `london_PM25_hist_data_w_label.csv.manifest.json`
pub fn manifest_path(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(MANIFEST_SUFFIX);
    artifact.with_file_name(name)
}

impl CacheManifest {
    /// Loads the manifest next to `artifact`; unreadable or corrupt manifests count as absent.
    pub fn load(artifact: &Path) -> Option<Self> {
        let path = manifest_path(artifact);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Ignoring unreadable cache manifest {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn write(&self, artifact: &Path) -> Result<(), CacheError> {
        let path = manifest_path(artifact);
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| CacheError::ManifestWrite(path.clone(), e))?;
        debug!("Wrote cache manifest {}", path.display());
        Ok(())
    }
}

/// Whether `artifact` was built with exactly `key`.
pub fn is_fresh(artifact: &Path, key: &CacheKey) -> bool {
    if !artifact.is_file() {
        return false;
    }
    let Some(manifest) = CacheManifest::load(artifact) else {
        info!(
            "Artifact {} has no cache manifest, rebuilding",
            artifact.display()
        );
        return false;
    };
    let fresh = manifest.key == *key;
    if !fresh {
        info!(
            "Inputs of {} changed since it was built, rebuilding",
            artifact.display()
        );
    }
    fresh
}
