use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::session::{SessionKey, SessionStore};

pub const SESSION_FILE: &str = "session.json";

/// Session keys kept as a flat JSON object, rewritten atomically on each
/// change.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSessionStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let path = data_dir.join(SESSION_FILE);
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => match serde_json::from_str(&text) {
                Ok(values) => values,
                Err(error) => {
                    warn!(file = %path.display(), %error, "session file unreadable; treating as signed out");
                    BTreeMap::new()
                }
            },
            Err(source) if source.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        debug!(file = %path.display(), keys = values.len(), "opened session file");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if self.values.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => {
                    info!(file = %self.path.display(), "removed session file");
                    Ok(())
                }
                Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(io_err(source)),
            };
        }

        let serialized = serde_json::to_string_pretty(&self.values)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        writeln!(temp, "{serialized}").map_err(io_err)?;
        temp.flush().map_err(io_err)?;
        temp.persist(&self.path).map_err(|err| io_err(err.error))?;

        debug!(file = %self.path.display(), keys = self.values.len(), "saved session file");
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        self.values.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.as_str().to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: SessionKey) -> Result<(), StoreError> {
        if self.values.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.persist()
    }
}
