//! Asset registry: logical path → asset, with permalink reverse lookup.
//!
//! Registration takes `&mut self` and resolution `&self`, so the borrow
//! checker enforces the startup-then-serve lifecycle: once a registry is
//! shared with request handlers it can no longer gain entries.

mod matcher;
mod tree;

pub use matcher::{PathMatcher, is_pattern};
pub use tree::{ContentTree, DirTree, MemoryTree, TreeEntry};

use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use crate::asset::{Asset, ContentSource, FileSource, MemorySource};
use crate::error::AssetError;
use crate::{debug, permalink};

/// Outcome of resolving a request path.
#[derive(Debug)]
pub enum Lookup<'a> {
    /// The path is a registered logical path.
    Exact(&'a Asset),
    /// The path is the current permalink of a registered asset.
    Hashed(&'a Asset),
    /// Neither the path nor its decoded base path is registered.
    NotFound,
    /// The path is unregistered and carries no hash segment.
    NoHash,
    /// The embedded hash does not match the asset's current digest.
    Stale,
}

impl<'a> Lookup<'a> {
    pub fn asset(&self) -> Option<&'a Asset> {
        match self {
            Self::Exact(asset) | Self::Hashed(asset) => Some(asset),
            Self::NotFound | Self::NoHash | Self::Stale => None,
        }
    }
}

/// A registered path and its permalink, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub permalink: String,
    pub location: String,
}

/// Owns every registered asset.
#[derive(Debug, Default)]
pub struct Registry {
    paths: PathMatcher<Asset>,
}

/// Registration call site as `file:line`.
#[track_caller]
fn location() -> String {
    let caller = Location::caller();
    format!("{}:{}", caller.file(), caller.line())
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content at `path`, replacing any previous asset there.
    ///
    /// `mime` overrides the type guessed from the extension.
    ///
    /// A pattern `path` (`/fonts/:file`, `/vendor/*`) serves every matching
    /// request path from the same content. Its permalink would embed the
    /// pattern itself, so [`Registry::permalink`] returns request paths
    /// under it unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty.
    #[track_caller]
    pub fn register(
        &mut self,
        path: &str,
        source: impl ContentSource + 'static,
        mime: Option<&str>,
    ) -> &mut Self {
        assert!(!path.is_empty(), "path can't be empty");

        let mut asset = Asset::new(path, source).with_location(location());
        if let Some(mime) = mime {
            asset = asset.with_mime(mime);
        }
        self.insert(asset)
    }

    /// Register bytes fixed at registration time.
    #[track_caller]
    pub fn register_bytes(&mut self, path: &str, content: impl Into<Arc<[u8]>>) -> &mut Self {
        self.register(path, MemorySource::new(content), None)
    }

    /// Register a file read from disk on demand.
    #[track_caller]
    pub fn register_file(&mut self, path: &str, file: impl Into<PathBuf>) -> &mut Self {
        self.register(path, FileSource::new(file), None)
    }

    /// Register every leaf of a content tree under its tree-relative path.
    ///
    /// Returns the number of registered assets.
    #[track_caller]
    pub fn register_tree(&mut self, tree: &impl ContentTree) -> Result<usize, AssetError> {
        let location = location();
        let entries = tree.entries()?;
        let count = entries.len();
        for entry in entries {
            let asset = Asset::boxed(&entry.path, entry.source).with_location(location.clone());
            self.insert(asset);
        }
        Ok(count)
    }

    /// Insert a prepared asset under its own path.
    pub fn insert(&mut self, asset: Asset) -> &mut Self {
        let path = asset.path().to_string();
        if self.paths.insert(&path, asset).is_some() {
            debug!("asset"; "replaced {}", path);
        }
        self
    }

    /// Exact lookup of a logical path, without forcing initialization.
    pub fn get(&self, path: &str) -> Option<&Asset> {
        if path.is_empty() {
            return None;
        }
        self.paths.find(&normalize(path))
    }

    /// Resolve a request path by exact match, then as a permalink.
    ///
    /// Forces initialization of the matched asset; an unreadable content
    /// source is the only error.
    pub fn resolve(&self, path: &str) -> Result<Lookup<'_>, AssetError> {
        if path.is_empty() {
            return Ok(Lookup::NotFound);
        }
        let path = normalize(path);

        if let Some(asset) = self.paths.find(&path) {
            asset.init()?;
            return Ok(Lookup::Exact(asset));
        }

        let Ok(decoded) = permalink::decode(&path) else {
            return Ok(Lookup::NoHash);
        };
        let Some(asset) = self.paths.find(&decoded.path) else {
            return Ok(Lookup::NotFound);
        };

        let expected = asset.hash()?;
        if decoded.hash != expected {
            debug!("asset"; "stale permalink {} (current hash {})", path, expected);
            return Ok(Lookup::Stale);
        }
        Ok(Lookup::Hashed(asset))
    }

    /// Resolve and keep only a matching asset.
    pub fn find(&self, path: &str) -> Result<Option<&Asset>, AssetError> {
        Ok(self.resolve(path)?.asset())
    }

    /// Permalink for `path`, or `path` unchanged when unregistered,
    /// unreadable or served by a pattern.
    pub fn permalink(&self, path: &str) -> String {
        match self.find(path) {
            Ok(Some(asset)) if !is_pattern(asset.path()) => asset
                .permalink()
                .map_or_else(|_| path.to_string(), str::to_string),
            _ => path.to_string(),
        }
    }

    /// Subresource integrity value for a registered path.
    pub fn integrity(&self, path: &str) -> Option<String> {
        self.find(path).ok().flatten()?.integrity().ok()
    }

    /// Every registered path with its permalink, sorted by path.
    ///
    /// Hashes every asset, so this reads all content once.
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self
            .paths
            .iter()
            .map(|(path, asset)| Route {
                path: path.to_string(),
                permalink: asset
                    .permalink()
                    .map_or_else(|_| path.to_string(), str::to_string),
                location: asset.location().to_string(),
            })
            .collect();
        routes.sort_by(|a, b| a.path.cmp(&b.path));
        routes
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
