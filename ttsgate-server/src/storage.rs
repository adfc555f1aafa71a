//! On-disk storage for file output mode.

use std::path::{Path, PathBuf};

use thiserror::Error;
use ttsgate_core::AudioFormat;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid audio file name '{0}'")]
    InvalidName(String),

    #[error("Audio file '{0}' not found")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat directory of generated audio files
#[derive(Debug, Clone)]
pub struct AudioStorage {
    root: PathBuf,
}

impl AudioStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a fresh name and return that name
    pub async fn save(&self, bytes: &[u8], format: AudioFormat) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let file_name = format!("{}.{}", Uuid::new_v4().simple(), format.extension());
        tokio::fs::write(self.root.join(&file_name), bytes).await?;
        Ok(file_name)
    }

    /// Read a previously saved file back
    pub async fn load(&self, file_name: &str) -> Result<(Vec<u8>, AudioFormat), StorageError> {
        let format = Self::validate_name(file_name)?;
        match tokio::fs::read(self.root.join(file_name)).await {
            Ok(bytes) => Ok((bytes, format)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Accept only plain `<stem>.<ext>` names with a known audio extension
    fn validate_name(file_name: &str) -> Result<AudioFormat, StorageError> {
        let invalid = || StorageError::InvalidName(file_name.to_string());

        let plain = !file_name.is_empty()
            && !file_name.starts_with('.')
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !file_name.contains("..");
        if !plain {
            return Err(invalid());
        }

        let (_, ext) = file_name.rsplit_once('.').ok_or_else(invalid)?;
        AudioFormat::from_extension(ext).ok_or_else(invalid)
    }
}
