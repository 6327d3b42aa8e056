//! Content trees: collections of files registered in one call.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;

use crate::asset::{ContentSource, FileSource, MemorySource};
use crate::error::AssetError;

/// One leaf file of a content tree.
pub struct TreeEntry {
    /// Tree-relative path with `/` separators and no leading slash.
    pub path: String,
    pub source: Box<dyn ContentSource>,
}

/// Yields every leaf file of a tree.
pub trait ContentTree {
    fn entries(&self) -> Result<Vec<TreeEntry>, AssetError>;
}

/// A directory on disk, walked recursively.
#[derive(Debug, Clone)]
pub struct DirTree {
    root: PathBuf,
}

impl DirTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scope the tree to a sub-directory of its root.
    pub fn sub(&self, dir: impl AsRef<Path>) -> Self {
        Self::new(self.root.join(dir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk_error(&self, source: io::Error) -> AssetError {
        AssetError::Walk {
            root: self.root.clone(),
            source,
        }
    }
}

impl ContentTree for DirTree {
    fn entries(&self) -> Result<Vec<TreeEntry>, AssetError> {
        if !self.root.is_dir() {
            return Err(self.walk_error(io::Error::new(
                io::ErrorKind::NotFound,
                "not a directory",
            )));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).sort(true) {
            let entry = entry.map_err(|e| self.walk_error(io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file = entry.path();
            let Ok(rel) = file.strip_prefix(&self.root) else {
                continue;
            };
            let path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            entries.push(TreeEntry {
                path,
                source: Box::new(FileSource::new(file)),
            });
        }
        Ok(entries)
    }
}

/// An in-memory tree, typically built from `include_bytes!` data.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: Vec<(String, Arc<[u8]>)>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at a tree-relative path.
    pub fn file(mut self, path: &str, content: impl Into<Arc<[u8]>>) -> Self {
        let path = path.trim_start_matches('/').to_string();
        self.files.push((path, content.into()));
        self
    }
}

impl ContentTree for MemoryTree {
    fn entries(&self) -> Result<Vec<TreeEntry>, AssetError> {
        Ok(self
            .files
            .iter()
            .map(|(path, content)| TreeEntry {
                path: path.clone(),
                source: Box::new(MemorySource::new(Arc::clone(content))),
            })
            .collect())
    }
}
