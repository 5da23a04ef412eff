// crates/fallback/src/store.rs
//! Durable last-known-good snapshots
//!
//! One JSON file per data type, holding the payload and the time it was
//! written. Writes go through a temporary file in the same directory and an
//! atomic rename, so a reader never sees a partially written snapshot.
//!
//! File names are the escaped data type. When escaping would make a name too
//! long for the filesystem, the file is named by a digest instead and the
//! data type is read back from the snapshot itself.

use crate::error::{FallbackError, FallbackResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const SNAPSHOT_EXTENSION: &str = "json";

/// Longest escaped stem used as a file name as-is
const MAX_STEM_LEN: usize = 128;

/// Longest readable prefix kept in front of a digest stem
const MAX_PREFIX_LEN: usize = 64;

/// Separates the readable prefix from the digest; never produced by escaping
const DIGEST_SEPARATOR: char = '~';

/// A stored payload with its write time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Data type the snapshot was saved under
    #[serde(default)]
    pub data_type: String,
    /// Last successful payload
    pub data: T,
    /// When the payload was saved
    pub updated_at: DateTime<Utc>,
}

/// Summary of a stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    /// Logical data type the snapshot is keyed by
    pub data_type: String,
    /// File holding the snapshot
    pub path: PathBuf,
}

/// File-backed store of fallback snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    /// Opens a store rooted at `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl Into<PathBuf>) -> FallbackResult<Self> {
        let data_dir = data_dir.into();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).map_err(|e| FallbackError::DirectoryCreationError {
                path: data_dir.clone(),
                source: e,
            })?;
            log::info!("Created snapshot directory: {}", data_dir.display());
        }
        Ok(Self { data_dir })
    }

    /// Returns the directory snapshots are stored in
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the file a data type is stored in
    pub fn path_for(&self, data_type: &str) -> FallbackResult<PathBuf> {
        if data_type.is_empty() {
            return Err(FallbackError::InvalidDataType(data_type.to_string()));
        }
        Ok(self
            .data_dir
            .join(format!("{}.{}", file_stem(data_type), SNAPSHOT_EXTENSION)))
    }

    /// Persists `data` as the snapshot for `data_type`, replacing any previous one
    pub fn save<T: Serialize>(&self, data_type: &str, data: &T) -> FallbackResult<()> {
        let path = self.path_for(data_type)?;
        let snapshot = Snapshot {
            data_type: data_type.to_string(),
            data,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let temp_file = NamedTempFile::new_in(&self.data_dir).map_err(FallbackError::IoError)?;
        write_atomic(temp_file, &path, &json)?;

        log::debug!("Saved snapshot '{}' to {}", data_type, path.display());
        Ok(())
    }

    /// Loads the snapshot for `data_type`
    ///
    /// A missing file is `Ok(None)`; an unreadable or malformed one is an error.
    pub fn load_snapshot<T: DeserializeOwned>(
        &self,
        data_type: &str,
    ) -> FallbackResult<Option<Snapshot<T>>> {
        let path = self.path_for(data_type)?;
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| FallbackError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let snapshot: Snapshot<T> = serde_json::from_str(&contents)
            .map_err(|e| FallbackError::ParseError { path, source: e })?;
        if !snapshot.data_type.is_empty() && snapshot.data_type != data_type {
            log::warn!(
                "Snapshot file for '{}' holds '{}', ignoring it",
                data_type,
                snapshot.data_type
            );
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Loads the payload for `data_type`, treating any failure as absent
    pub fn load<T: DeserializeOwned>(&self, data_type: &str) -> Option<T> {
        match self.load_snapshot(data_type) {
            Ok(snapshot) => snapshot.map(|s| s.data),
            Err(e) => {
                log::warn!("Ignoring unusable snapshot '{}': {}", data_type, e);
                None
            }
        }
    }

    /// Deletes the snapshot for `data_type`, returning whether one existed
    pub fn delete(&self, data_type: &str) -> FallbackResult<bool> {
        let path = self.path_for(data_type)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FallbackError::WriteError { path, source: e }),
        }
    }

    /// Lists stored snapshots, sorted by data type
    pub fn list(&self) -> FallbackResult<Vec<SnapshotInfo>> {
        let entries = fs::read_dir(&self.data_dir).map_err(|e| FallbackError::ReadError {
            path: self.data_dir.clone(),
            source: e,
        })?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let data_type = if stem.contains(DIGEST_SEPARATOR) {
                stored_data_type(&path)
            } else {
                decode_data_type(stem)
            };
            let Some(data_type) = data_type else {
                continue;
            };
            snapshots.push(SnapshotInfo { data_type, path });
        }

        snapshots.sort_by(|a, b| a.data_type.cmp(&b.data_type));
        Ok(snapshots)
    }
}

/// Writes content to a temporary file and atomically renames it over `target`
fn write_atomic(mut temp_file: NamedTempFile, target: &Path, content: &str) -> FallbackResult<()> {
    temp_file
        .write_all(content.as_bytes())
        .map_err(FallbackError::IoError)?;
    temp_file.flush().map_err(FallbackError::IoError)?;

    temp_file
        .persist(target)
        .map_err(|e| FallbackError::WriteError {
            path: target.to_path_buf(),
            source: e.error,
        })?;

    Ok(())
}

/// Returns the file stem of a data type
///
/// Short data types are escaped. Longer ones become their leading safe
/// characters, [`DIGEST_SEPARATOR`] and a SHA-256 prefix, which keeps every
/// name within filesystem limits.
fn file_stem(data_type: &str) -> String {
    let encoded = encode_data_type(data_type);
    if encoded.len() <= MAX_STEM_LEN {
        return encoded;
    }

    let prefix: String = data_type
        .chars()
        .take_while(|c| c.is_ascii() && is_safe_byte(*c as u8))
        .take(MAX_PREFIX_LEN)
        .collect();
    let digest = Sha256::digest(data_type.as_bytes());
    let hex: String = digest.iter().take(16).map(|b| format!("{:02x}", b)).collect();
    format!("{}{}{}", prefix, DIGEST_SEPARATOR, hex)
}

/// Reads the data type recorded inside a snapshot file
fn stored_data_type(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    value
        .get("data_type")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn is_safe_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

/// Maps a data type to a file stem, escaping anything outside `[A-Za-z0-9_-]`
///
/// Escaping is reversible, so distinct data types never share a file.
fn encode_data_type(data_type: &str) -> String {
    let mut encoded = String::with_capacity(data_type.len());
    for byte in data_type.bytes() {
        if is_safe_byte(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn decode_data_type(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else if is_safe_byte(bytes[i]) {
            decoded.push(bytes[i]);
            i += 1;
        } else {
            return None;
        }
    }
    String::from_utf8(decoded).ok()
}
