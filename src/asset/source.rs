//! Content sources: the capability an asset uses to read its bytes.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Readable byte stream handed out by a [`ContentSource`].
pub type Reader = Box<dyn Read + Send>;

/// Opens a fresh stream over an asset's content.
///
/// May be called any number of times; every stream must yield the same bytes.
pub trait ContentSource: Send + Sync {
    fn open(&self) -> io::Result<Reader>;
}

impl<F> ContentSource for F
where
    F: Fn() -> io::Result<Reader> + Send + Sync,
{
    fn open(&self) -> io::Result<Reader> {
        self()
    }
}

/// Bytes fixed at registration time.
#[derive(Debug, Clone)]
pub struct MemorySource(Arc<[u8]>);

impl MemorySource {
    pub fn new(content: impl Into<Arc<[u8]>>) -> Self {
        Self(content.into())
    }
}

impl ContentSource for MemorySource {
    fn open(&self) -> io::Result<Reader> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.0))))
    }
}

/// A file read from disk on every open.
#[derive(Debug, Clone)]
pub struct FileSource(PathBuf);

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl ContentSource for FileSource {
    fn open(&self) -> io::Result<Reader> {
        Ok(Box::new(File::open(&self.0)?))
    }
}
