use serde::Serialize;
use serde::de::DeserializeOwned;

use std::path::{Path, PathBuf};

use crate::error::CommonError;

/// The trait for loading configuration data.
pub trait Loader<T> {
    /// Loads the configuration data.
    fn load(&self) -> Result<T, CommonError>;
}

/// The trait for saving configuration data.
pub trait Saver<T> {
    /// Saves the configuration data.
    fn save(&self, config: &T) -> Result<(), CommonError>;
}

/// Supported on-disk formats, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// Data will be serialized and deserialized according to the file extension.
    /// Only `.json` and `.toml` files are supported.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists yet.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn format(&self) -> Result<Format, CommonError> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(CommonError::UnsupportedFormat(self.path.clone())),
        }
    }
}

impl<T: DeserializeOwned> Loader<T> for FileStore {
    fn load(&self) -> Result<T, CommonError> {
        let format = self.format()?;
        let raw =
            std::fs::read_to_string(&self.path).map_err(|e| CommonError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), bytes = raw.len(), "loading config");
        match format {
            Format::Json => Ok(serde_json::from_str(&raw)?),
            Format::Toml => Ok(toml::from_str(&raw)?),
        }
    }
}

impl<T: Serialize> Saver<T> for FileStore {
    fn save(&self, config: &T) -> Result<(), CommonError> {
        let raw = match self.format()? {
            Format::Json => serde_json::to_string_pretty(config)?,
            Format::Toml => toml::to_string_pretty(config)?,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CommonError::io(parent, e))?;
            }
        }
        std::fs::write(&self.path, raw).map_err(|e| CommonError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        delay_ms: u64,
    }

    fn sample() -> Sample {
        Sample {
            name: "editor".into(),
            delay_ms: 5000,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("config.json"));
        store.save(&sample()).unwrap();
        let loaded: Sample = store.load().unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("config.toml"));
        store.save(&sample()).unwrap();
        assert!(store.exists());
        let loaded: Sample = store.load().unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_unsupported_extension() {
        let store = FileStore::new("config.yaml");
        let err = Loader::<Sample>::load(&store).unwrap_err();
        assert!(matches!(err, CommonError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.json"));
        let err = Loader::<Sample>::load(&store).unwrap_err();
        assert!(matches!(err, CommonError::Io { .. }));
    }
}
