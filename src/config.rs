//! Configuration loaded from `assetlink.toml`.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"   # Network interface (127.0.0.1 = localhost only)
//! port = 5277               # First port tried, up to 10 successive ports
//! workers = 4               # Request handler threads
//!
//! [[assets]]
//! dir = "public"            # Relative to the config file
//!
//! [permalink]
//! only_dirs = ["/css/"]     # Path prefixes with permalinks (empty = all)
//! only_mime = ["image/"]    # MIME prefixes with permalinks (empty = all)
//! css_rewrite = true        # Rewrite url(...) inside stylesheets
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::error::AssetError;
use crate::log;
use crate::registry::{DirTree, Registry};
use crate::serve::{Filter, Gateway};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "assetlink.toml";

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the loaded config file.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative asset paths are resolved against.
    #[serde(skip)]
    root: PathBuf,

    pub serve: ServeConfig,
    pub assets: Vec<AssetDir>,
    pub permalink: PermalinkConfig,
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Request handler threads.
    pub workers: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5277,
            workers: 4,
        }
    }
}

/// One `[[assets]]` entry: a directory registered as a content tree.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetDir {
    pub dir: PathBuf,
}

/// `[permalink]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PermalinkConfig {
    /// Only assets under these path prefixes get permalinks.
    pub only_dirs: Vec<String>,

    /// Only assets whose MIME type starts with one of these get permalinks.
    pub only_mime: Vec<String>,

    /// Rewrite `url(...)` references in served stylesheets.
    pub css_rewrite: bool,
}

impl Default for PermalinkConfig {
    fn default() -> Self {
        Self {
            only_dirs: Vec::new(),
            only_mime: Vec::new(),
            css_rewrite: true,
        }
    }
}

impl Config {
    /// Load, report unknown fields and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.config_path = path.to_path_buf();
        config.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Join a path with the config root.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// CLI flags take precedence over `[serve]`.
    pub fn apply_serve_options(&mut self, interface: Option<IpAddr>, port: Option<u16>) {
        if let Some(interface) = interface {
            self.serve.interface = interface;
        }
        if let Some(port) = port {
            self.serve.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.workers == 0 {
            return Err(ConfigError::Validation(
                "[serve] workers must be at least 1".into(),
            ));
        }
        for asset in &self.assets {
            let dir = self.root_join(&asset.dir);
            if !dir.is_dir() {
                return Err(ConfigError::Validation(format!(
                    "[[assets]] dir `{}` is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Which assets may be served and referenced by permalink.
    pub fn permalink_filter(&self) -> Filter {
        let dirs = &self.permalink.only_dirs;
        let mimes = &self.permalink.only_mime;
        match (dirs.is_empty(), mimes.is_empty()) {
            (true, true) => Filter::all(),
            (false, true) => Filter::directories(dirs.iter().cloned()),
            (true, false) => Filter::mime_prefixes(mimes.iter().cloned()),
            (false, false) => Filter::directories(dirs.iter().cloned())
                .and(Filter::mime_prefixes(mimes.iter().cloned())),
        }
    }

    pub fn css_filter(&self) -> Filter {
        if self.permalink.css_rewrite {
            Filter::all()
        } else {
            Filter::none()
        }
    }

    /// Register every `[[assets]]` directory.
    pub fn registry(&self) -> Result<Registry, AssetError> {
        let mut registry = Registry::new();
        for asset in &self.assets {
            let count = registry.register_tree(&DirTree::new(self.root_join(&asset.dir)))?;
            log!("asset"; "{} assets from {}", count, asset.dir.display());
        }
        Ok(registry)
    }

    /// Registry plus the configured filters.
    pub fn gateway(&self) -> Result<Gateway, AssetError> {
        Ok(Gateway::new(self.registry()?)
            .with_permalink_filter(self.permalink_filter())
            .with_css_filter(self.css_filter()))
    }
}

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
