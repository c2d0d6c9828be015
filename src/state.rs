//! Durable poll cursor — the high-water UID and bootstrap flag.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::StateError;

/// Persisted poll cursor.
///
/// `last_uid` never decreases, in-process or across restarts. `initialized`
/// stays false only until the first cycle completes (or bootstraps).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub last_uid: u32,
    pub initialized: bool,
}

impl Cursor {
    /// Advance the high-water mark. Never moves backwards.
    pub fn advance(&mut self, uid: u32) {
        self.last_uid = self.last_uid.max(uid);
    }

    /// Load the cursor from `path`.
    ///
    /// A missing file yields the fresh default; a file that exists but does
    /// not parse is an error the caller must treat as fatal, so a corrupt
    /// cursor can never silently re-notify or re-skip a backlog.
    pub async fn load(path: &Path) -> Result<Self, StateError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(StateError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| StateError::Corrupt {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Persist the cursor to `path`, pretty-printed.
    ///
    /// Writes a `.tmp` sibling then renames over the target, so a crash
    /// mid-write leaves the previous valid state intact.
    pub async fn save(&self, path: &Path) -> Result<(), StateError> {
        let io_err = |e: std::io::Error| StateError::Io {
            path: path.display().to_string(),
            source: e,
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| io_err(e.into()))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).await.map_err(io_err)?;
        fs::rename(&tmp, path).await.map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_fresh_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = Cursor::load(&dir.path().join("absent.json")).await.unwrap();
        assert_eq!(cursor, Cursor::default());
        assert_eq!(cursor.last_uid, 0);
        assert!(!cursor.initialized);
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let cursor = Cursor {
            last_uid: 42,
            initialized: true,
        };
        cursor.save(&path).await.unwrap();

        let loaded = Cursor::load(&path).await.unwrap();
        assert_eq!(loaded, cursor);

        // Wire format is the pretty-printed JSON object other tooling expects.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"last_uid\": 42"), "got {raw}");
        assert!(raw.contains("\"initialized\": true"), "got {raw}");
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Cursor::load(&path).await.unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        Cursor::default().save(&path).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn advance_is_monotone() {
        let mut cursor = Cursor::default();
        cursor.advance(7);
        assert_eq!(cursor.last_uid, 7);
        cursor.advance(3);
        assert_eq!(cursor.last_uid, 7);
        cursor.advance(9);
        assert_eq!(cursor.last_uid, 9);
    }
}
