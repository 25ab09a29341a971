use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use velostash::{KeyValueStore, StoreError, utils::encoding::stored_size};

use crate::{decode_from_filename, encode_for_filename, error::FileStoreError};

/// A file-based [`KeyValueStore`].
///
/// Each entry is stored as a separate file in a designated directory. File names are the
/// percent-encoded keys with a `.json` extension and file contents are the stored text,
/// so the data directory can be inspected by hand. Usage is accounted the same way a
/// browser storage area does it, which lets an optional quota reject oversized writes.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
    quota: Option<u64>,
    used: u64,
}

impl FileStore {
    /// The file extension used for all data files.
    const FILE_EXTENSION: &'static str = ".json";

    /// Opens a store at `data_dir`, creating the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or its entries cannot be read.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use velostash_fs::FileStore;
    ///
    /// let store = FileStore::new("./data")?;
    /// # Ok::<(), velostash_fs::FileStoreError>(())
    /// ```
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        let mut store = Self {
            data_dir,
            quota: None,
            used: 0,
        };
        store.used = store.measure()?;
        debug!(dir = %store.data_dir.display(), used = store.used, "file store opened");
        Ok(store)
    }

    /// Opens a store that rejects writes once `quota` bytes are in use.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or its entries cannot be read.
    pub fn with_quota(data_dir: impl Into<PathBuf>, quota: u64) -> Result<Self, FileStoreError> {
        let mut store = Self::new(data_dir)?;
        store.quota = Some(quota);
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn quota(&self) -> Option<u64> {
        self.quota
    }

    pub fn used_bytes(&self) -> u64 {
        self.used
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}{}", encode_for_filename(key), Self::FILE_EXTENSION))
    }

    fn filename_to_key(filename: &str) -> Result<Option<String>, FileStoreError> {
        let Some(stem) = filename.strip_suffix(Self::FILE_EXTENSION) else {
            return Ok(None);
        };
        decode_from_filename(stem)
            .map(Some)
            .ok_or_else(|| FileStoreError::MalformedName(filename.to_string()))
    }

    fn read(&self, key: &str) -> Result<Option<String>, FileStoreError> {
        match fs::read_to_string(self.key_to_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>, FileStoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.data_dir)?.flatten() {
            let Some(filename) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            match Self::filename_to_key(&filename) {
                Ok(Some(key)) => keys.push(key),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "skipping foreign file in data directory"),
            }
        }
        keys.sort_unstable();
        Ok(keys)
    }

    fn measure(&self) -> Result<u64, FileStoreError> {
        let mut total = 0;
        for key in self.list()? {
            if let Some(value) = self.read(&key)? {
                total += stored_size(&key, &value);
            }
        }
        Ok(total)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), FileStoreError> {
        let needed = stored_size(key, value);
        let released = self
            .read(key)?
            .map_or(0, |previous| stored_size(key, &previous));
        let projected = self.used.saturating_sub(released) + needed;
        if let Some(quota) = self.quota
            && projected > quota
        {
            return Err(FileStoreError::QuotaExceeded {
                key: key.to_string(),
                needed,
                remaining: quota.saturating_sub(self.used),
            });
        }

        fs::write(self.key_to_path(key), value)?;
        self.used = projected;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<Option<String>, FileStoreError> {
        let Some(data) = self.read(key)? else {
            return Ok(None);
        };
        fs::remove_file(self.key_to_path(key))?;
        self.used = self.used.saturating_sub(stored_size(key, &data));
        Ok(Some(data))
    }
}

impl KeyValueStore for FileStore {
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.write(key, value)?)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read(key)?)
    }

    fn remove_item(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.delete(key)?)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?)
    }
}
