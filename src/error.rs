//! Asset error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading asset content.
///
/// Resolution misses are not errors; see [`crate::registry::Lookup`].
#[derive(Debug, Error)]
pub enum AssetError {
    /// The content source of an asset could not be opened or read.
    #[error("can't read the file {path}: {source}")]
    ContentUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A content tree could not be walked during registration.
    #[error("can't walk `{}`", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AssetError {
    pub(crate) fn unavailable(path: &str, source: io::Error) -> Self {
        Self::ContentUnavailable {
            path: path.to_string(),
            source,
        }
    }
}
