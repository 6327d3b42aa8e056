//! assetlink - serve static assets under content-hashed permalinks.
//!
//! Assets are registered at logical paths (`/css/main.css`), hashed lazily
//! on first use and served both at the logical path and at a permalink
//! (`/css/main-1a2b3c4d5e6f.css`) that carries a one-year cache header.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register_tree(&DirTree::new("public"))?;
//! let gateway = Gateway::new(registry).with_permalink_filter(Filter::assets());
//! assert_eq!(gateway.permalink("/img/bg.png"), "/img/bg-e3b0c44298fc.png");
//! ```

pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod hash;
pub mod logger;
pub mod mime;
pub mod permalink;
pub mod registry;
pub mod serve;
pub mod state;

pub use asset::{Asset, ContentSource, FileSource, MemorySource};
pub use error::AssetError;
pub use hash::Digest;
pub use registry::{DirTree, Lookup, MemoryTree, Registry, Route};
pub use serve::{AssetRequest, Filter, Gateway, Reply};
