use std::{io, path::PathBuf};

use thiserror::Error;

/// Result alias for settings storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by a settings store.
///
/// A record that is merely missing or not ours is not an error; stores report it as nothing
/// stored so the defaults take over.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file exists but could not be read.
    #[error("reading settings from {}", path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The backing file or its directory could not be written.
    #[error("writing settings to {}", path.display())]
    Write {
        /// File or directory being written.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The settings could not be serialized.
    #[error("settings record could not be encoded")]
    Encode(#[source] serde_json::Error),
}
