//! Registered assets and their lazily computed metadata.
//!
//! An [`Asset`] starts with only a logical path and a content source. The
//! digest, detected MIME type and permalink are computed together on first
//! access and never change afterwards.

mod source;

pub use source::{ContentSource, FileSource, MemorySource, Reader};

use std::io::Read;
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::debug;
use crate::error::AssetError;
use crate::hash::Digest;
use crate::{mime, permalink};

/// Metadata derived from the full content bytes.
#[derive(Debug)]
struct Computed {
    digest: Digest,
    mime: String,
    permalink: String,
}

/// One registered logical path plus its content capability.
///
/// # Initialization
///
/// Uninitialized until the first call to an accessor that needs the digest.
/// That call takes the per-asset init lock, reads the content once and
/// publishes all derived fields at the same time. Concurrent first callers
/// wait on the lock and then observe the published value; later reads are
/// lock-free.
///
/// A read failure leaves the asset uninitialized and is returned to the
/// caller that triggered it.
pub struct Asset {
    path: String,
    source: Box<dyn ContentSource>,
    mime_hint: Option<String>,
    location: String,
    init_lock: Mutex<()>,
    computed: OnceLock<Computed>,
}

impl Asset {
    /// Create an asset. A leading `/` is added to `path` when missing.
    pub fn new(path: &str, source: impl ContentSource + 'static) -> Self {
        Self::boxed(path, Box::new(source))
    }

    /// Create an asset from an already boxed source.
    pub fn boxed(path: &str, source: Box<dyn ContentSource>) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            mime_hint: mime::from_path(&path).map(str::to_string),
            path,
            source,
            location: String::new(),
            init_lock: Mutex::new(()),
            computed: OnceLock::new(),
        }
    }

    /// Override the MIME type instead of guessing it from the extension.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    /// Attach a diagnostic registration location (`file:line`).
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// The logical path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether the digest has been computed.
    pub fn is_initialized(&self) -> bool {
        self.computed.get().is_some()
    }

    /// Open a fresh stream over the content.
    pub fn open(&self) -> Result<Reader, AssetError> {
        self.source
            .open()
            .map_err(|e| AssetError::unavailable(&self.path, e))
    }

    /// Read the whole content into memory.
    pub fn read(&self) -> Result<Vec<u8>, AssetError> {
        let mut data = Vec::new();
        self.open()?
            .read_to_end(&mut data)
            .map_err(|e| AssetError::unavailable(&self.path, e))?;
        Ok(data)
    }

    /// Force initialization if it has not happened yet.
    pub fn init(&self) -> Result<(), AssetError> {
        self.computed().map(|_| ())
    }

    fn computed(&self) -> Result<&Computed, AssetError> {
        if let Some(computed) = self.computed.get() {
            return Ok(computed);
        }

        let _guard = self.init_lock.lock();
        if let Some(computed) = self.computed.get() {
            return Ok(computed);
        }

        let data = self.read()?;
        let digest = Digest::of(&data);
        let mime = match &self.mime_hint {
            Some(hint) => hint.clone(),
            None => mime::sniff(&data).to_string(),
        };
        let permalink = permalink::encode(&self.path, &digest.short());
        debug!("asset"; "{} -> {} ({})", self.path, permalink, mime);

        Ok(self.computed.get_or_init(|| Computed {
            digest,
            mime,
            permalink,
        }))
    }

    /// The full content digest.
    pub fn digest(&self) -> Result<Digest, AssetError> {
        Ok(self.computed()?.digest)
    }

    /// The hashed path, e.g. `/asdf-b221d9dbb083.css`.
    pub fn permalink(&self) -> Result<&str, AssetError> {
        Ok(&self.computed()?.permalink)
    }

    /// Short digest embedded in the permalink.
    pub fn hash(&self) -> Result<String, AssetError> {
        Ok(self.computed()?.digest.short())
    }

    /// Full hex digest used as the entity tag (unquoted).
    pub fn etag(&self) -> Result<String, AssetError> {
        Ok(self.computed()?.digest.etag())
    }

    /// Subresource integrity value, e.g. `sha256-47DEQpj8...`.
    pub fn integrity(&self) -> Result<String, AssetError> {
        Ok(self.computed()?.digest.integrity())
    }

    /// Configured MIME type, or the one detected from content.
    ///
    /// Only forces initialization when no type was configured.
    pub fn mime_type(&self) -> Result<&str, AssetError> {
        match &self.mime_hint {
            Some(hint) => Ok(hint),
            None => Ok(&self.computed()?.mime),
        }
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("path", &self.path)
            .field("mime_hint", &self.mime_hint)
            .field("location", &self.location)
            .field("computed", &self.computed.get())
            .finish_non_exhaustive()
    }
}
