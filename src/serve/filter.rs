//! Per-asset eligibility rules.
//!
//! The gateway consults one filter to decide which assets may be served
//! and referenced through their permalink, and another to decide which CSS
//! assets get their `url(...)` references rewritten.

use std::fmt;
use std::sync::Arc;

use crate::asset::Asset;

type Predicate = dyn Fn(&Asset) -> bool + Send + Sync;

/// A shareable `Fn(&Asset) -> bool` rule.
#[derive(Clone)]
pub struct Filter {
    name: &'static str,
    predicate: Arc<Predicate>,
}

impl Filter {
    /// Arbitrary rule.
    pub fn new(predicate: impl Fn(&Asset) -> bool + Send + Sync + 'static) -> Self {
        Self::named("custom", predicate)
    }

    fn named(name: &'static str, predicate: impl Fn(&Asset) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name,
            predicate: Arc::new(predicate),
        }
    }

    /// Every asset.
    pub fn all() -> Self {
        Self::named("all", |_| true)
    }

    /// No asset.
    pub fn none() -> Self {
        Self::named("none", |_| false)
    }

    /// Assets whose logical path starts with one of `prefixes`.
    pub fn directories<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        Self::named("directories", move |asset| {
            prefixes.iter().any(|p| asset.path().starts_with(p.as_str()))
        })
    }

    /// Assets below the root, i.e. with a `/` after the leading one.
    pub fn sub_directories() -> Self {
        Self::named("sub_directories", |asset| asset.path()[1..].contains('/'))
    }

    /// Images, stylesheets and scripts.
    pub fn assets() -> Self {
        Self::mime_prefixes([
            "image/",
            "text/css",
            "application/javascript",
            "text/javascript",
        ])
    }

    /// Assets whose MIME type equals one of `mimes`.
    pub fn mime_types<I, S>(mimes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mimes: Vec<String> = mimes.into_iter().map(Into::into).collect();
        Self::named("mime_types", move |asset| {
            asset
                .mime_type()
                .is_ok_and(|mime| mimes.iter().any(|m| m == mime))
        })
    }

    /// Assets whose MIME type starts with one of `prefixes`.
    pub fn mime_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        Self::named("mime_prefixes", move |asset| {
            asset
                .mime_type()
                .is_ok_and(|mime| prefixes.iter().any(|p| mime.starts_with(p.as_str())))
        })
    }

    /// Assets matched by both filters.
    pub fn and(self, other: Filter) -> Self {
        Self::named("and", move |asset| self.matches(asset) && other.matches(asset))
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        (self.predicate)(asset)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.name).finish()
    }
}
