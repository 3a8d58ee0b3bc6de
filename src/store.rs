//! JSON document store backing the scheduler's crash recovery.
//!
//! Each [`Document`] lives in its own file inside the state directory.
//! A missing file is reported as `Ok(None)`, distinct from an I/O failure.
//! Writes go through a temp file, fsync and rename so a crash leaves either
//! the old or the new document on disk, never a torn one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::state::Document;

pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of<D: Document>(&self) -> PathBuf {
        self.dir.join(D::FILE_NAME)
    }

    pub fn load<D: Document>(&self) -> Result<Option<D>, StoreError> {
        let path = self.path_of::<D>();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Parse { path, source })
    }

    pub fn save<D: Document>(&self, doc: &D) -> Result<(), StoreError> {
        let path = self.path_of::<D>();
        let json = serde_json::to_string_pretty(doc).map_err(|source| StoreError::Serialize {
            name: D::FILE_NAME,
            source,
        })?;
        write_atomic(&path, json.as_bytes())
    }

    /// Delete a document. Removing one that does not exist is not an error.
    pub fn remove<D: Document>(&self) -> Result<(), StoreError> {
        let path = self.path_of::<D>();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { path, source }),
        }
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
    file.write_all(contents).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DailyProgress, RunState, Settings};
    use tempfile::TempDir;

    #[test]
    fn test_missing_document_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());

        assert!(store.load::<RunState>().unwrap().is_none());
        assert!(store.load::<DailyProgress>().unwrap().is_none());
        assert!(store.load::<Settings>().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("nested"));

        let daily = DailyProgress {
            sleep_duration: 9_000.5,
            current_frame: 2,
        };
        store.save(&daily).unwrap();

        assert_eq!(store.load::<DailyProgress>().unwrap(), Some(daily));
        assert!(!dir.path().join("nested/daily_progress.json.tmp").exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());

        store.save(&Settings::default()).unwrap();
        store.remove::<Settings>().unwrap();
        store.remove::<Settings>().unwrap();
        assert!(store.load::<Settings>().unwrap().is_none());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        fs::write(dir.path().join("state.json"), "{ not json").unwrap();

        let err = store.load::<RunState>().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn test_operator_settings_file_is_readable() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("settings.json"),
            r#"{ "fps": 24, "len_in_seconds": 20, "real_time_duration_in_days": 4 }"#,
        )
        .unwrap();

        let settings = JsonStore::new(dir.path()).load::<Settings>().unwrap().unwrap();
        assert_eq!(settings.total_frames(), 480);
        assert_eq!(settings.real_time_duration_in_days, 4);
    }
}
