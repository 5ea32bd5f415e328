//! Directory-backed [`KvStore`]: one file per key.

use crate::{KvStore, PersistenceError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const TMP_FILENAME_INFIX: &str = ".tmp.";

/// Stores each key as a file named after the key inside `dir`.
///
/// Writes land in a uniquely named temporary file first and are then renamed
/// over the target, so readers never observe a half-written value.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Uses `dir` as the store root. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(PersistenceError::InvalidStore(format!(
                "Key '{key}' cannot be used as a file name"
            )));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;

        let tmp_path = self
            .dir
            .join(format!("{key}{TMP_FILENAME_INFIX}{}", Uuid::new_v4()));
        let written = match fs::write(&tmp_path, value).await {
            Ok(()) => fs::rename(&tmp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            remove_temporary(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

async fn remove_temporary(tmp_path: &Path) {
    match fs::remove_file(tmp_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::error!(
            "Failed to remove temporary file {}: {e}",
            tmp_path.display()
        ),
    }
}
