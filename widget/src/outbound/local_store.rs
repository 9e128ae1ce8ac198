//! JSON-file implementation of the local store.
//!
//! The whole map is rewritten on every change: staged under a unique name
//! and renamed over the old file, so a crash never leaves a torn file.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cap_std::{ambient_authority, fs::Dir};
use directories::ProjectDirs;
use uuid::Uuid;

use crate::domain::ports::{LocalStore, LocalStoreError};

const STORE_FILE_NAME: &str = "store.json";

/// Default store location under the platform config directory.
pub fn default_store_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "feedback-widget").map(|dirs| dirs.config_dir().join(STORE_FILE_NAME))
}

/// Local store backed by one JSON object file.
#[derive(Debug)]
pub struct FileLocalStore {
    directory: PathBuf,
    file_name: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLocalStore {
    /// Store at `path`. The file and its directory are created on first write.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Io`] when `path` has no file name.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, LocalStoreError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| LocalStoreError::io(format!("{} has no file name", path.display())))?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self {
            directory,
            file_name,
            write_lock: Mutex::new(()),
        })
    }

    /// Full path of the backing file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    fn open_dir(&self) -> Result<Dir, LocalStoreError> {
        Dir::create_ambient_dir_all(&self.directory, ambient_authority())
            .and_then(|()| Dir::open_ambient_dir(&self.directory, ambient_authority()))
            .map_err(|error| io_error(&self.directory, &error))
    }

    fn load(&self, dir: &Dir) -> Result<BTreeMap<String, String>, LocalStoreError> {
        let raw = match dir.read_to_string(&self.file_name) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => return Err(io_error(&self.path(), &error)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|error| {
            LocalStoreError::corrupt(format!("{}: {error}", self.path().display()))
        })
    }

    fn save(&self, dir: &Dir, values: &BTreeMap<String, String>) -> Result<(), LocalStoreError> {
        let json = serde_json::to_vec_pretty(values)
            .map_err(|error| LocalStoreError::corrupt(error.to_string()))?;
        let staged = format!(".{}.tmp-{}", self.file_name.display(), Uuid::new_v4().simple());
        dir.write(&staged, json)
            .and_then(|()| dir.rename(&staged, dir, &self.file_name))
            .map_err(|error| {
                let _cleanup_result = dir.remove_file(&staged);
                io_error(&self.path(), &error)
            })
    }

    fn modify(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), LocalStoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| LocalStoreError::io("local store lock poisoned"))?;
        let dir = self.open_dir()?;
        let mut values = self.load(&dir)?;
        if change(&mut values) {
            self.save(&dir, &values)?;
        }
        Ok(())
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let dir = match Dir::open_ambient_dir(&self.directory, ambient_authority()) {
            Ok(dir) => dir,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&self.directory, &error)),
        };
        Ok(self.load(&dir)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.modify(|values| values.insert(key.to_owned(), value.to_owned()).as_deref() != Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.modify(|values| values.remove(key).is_some())
    }
}

fn io_error(path: &Path, error: &io::Error) -> LocalStoreError {
    LocalStoreError::io(format!("{}: {error}", path.display()))
}
