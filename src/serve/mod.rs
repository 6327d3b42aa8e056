//! HTTP delivery of registered assets.
//!
//! [`Gateway::handle`] runs one request through the delivery steps:
//!
//! 1. resolve the path (logical or permalink), else fallback / 404
//! 2. `If-None-Match` containing the etag → 304
//! 3. `Content-Type`, then open the content (failure → 500)
//! 4. `Cache-Control: public, max-age=31536000` only for permalink requests
//! 5. quoted `ETag`
//! 6. CSS bodies have their `url(...)` references rewritten, everything
//!    else is streamed unchanged

mod css;
mod filter;
pub mod http;
mod reply;

pub use css::rewrite_css;
pub use filter::Filter;
pub use reply::{AssetRequest, Body, Reply};

use std::io::Read;

use crate::asset::Asset;
use crate::error::AssetError;
use crate::registry::{Lookup, Registry, is_pattern};
use crate::{debug, log, mime};

/// Cache directive for content-addressed URLs (one year, shareable).
pub const CACHE_FOREVER: &str = "public, max-age=31536000";

/// Handles requests that match no asset.
pub trait Fallback: Send + Sync {
    fn handle(&self, request: &AssetRequest) -> Reply;
}

impl<F> Fallback for F
where
    F: Fn(&AssetRequest) -> Reply + Send + Sync,
{
    fn handle(&self, request: &AssetRequest) -> Reply {
        self(request)
    }
}

/// Serves the assets of a [`Registry`].
pub struct Gateway {
    registry: Registry,
    /// Assets that may be served and referenced by permalink.
    permalink_filter: Filter,
    /// CSS assets whose body is rewritten.
    css_filter: Filter,
    fallback: Option<Box<dyn Fallback>>,
}

impl Gateway {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            permalink_filter: Filter::all(),
            css_filter: Filter::all(),
            fallback: None,
        }
    }

    pub fn with_permalink_filter(mut self, filter: Filter) -> Self {
        self.permalink_filter = filter;
        self
    }

    pub fn with_css_filter(mut self, filter: Filter) -> Self {
        self.css_filter = filter;
        self
    }

    /// Delegate unmatched requests instead of answering 404.
    pub fn with_fallback(mut self, fallback: impl Fallback + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve a path; permalink matches must pass the permalink filter.
    fn lookup(&self, path: &str) -> Result<Option<&Asset>, AssetError> {
        Ok(match self.registry.resolve(path)? {
            Lookup::Exact(asset) => Some(asset),
            Lookup::Hashed(asset) if self.permalink_filter.matches(asset) => Some(asset),
            Lookup::Hashed(asset) => {
                debug!("serve"; "permalink disabled for {}", asset.path());
                None
            }
            Lookup::NotFound | Lookup::NoHash | Lookup::Stale => None,
        })
    }

    /// Permalink of an eligible asset referenced by `path`.
    ///
    /// Pattern assets are never eligible.
    pub fn eligible_permalink(&self, path: &str) -> Option<String> {
        let asset = self.lookup(path).ok().flatten()?;
        if is_pattern(asset.path()) || !self.permalink_filter.matches(asset) {
            return None;
        }
        asset.permalink().ok().map(str::to_string)
    }

    /// Permalink for markup, or `path` unchanged when not eligible.
    pub fn permalink(&self, path: &str) -> String {
        self.eligible_permalink(path)
            .unwrap_or_else(|| path.to_string())
    }

    /// Answer one request.
    pub fn handle(&self, request: &AssetRequest) -> Reply {
        let path = if request.path.starts_with('/') {
            request.path.clone()
        } else {
            format!("/{}", request.path)
        };

        let asset = match self.lookup(&path) {
            Ok(Some(asset)) => asset,
            Ok(None) => {
                return match &self.fallback {
                    Some(fallback) => fallback.handle(request),
                    None => Reply::not_found(),
                };
            }
            Err(e) => return self.server_error(&e),
        };

        self.deliver(&path, asset, request)
            .unwrap_or_else(|e| self.server_error(&e))
    }

    fn deliver(
        &self,
        path: &str,
        asset: &Asset,
        request: &AssetRequest,
    ) -> Result<Reply, AssetError> {
        let etag = asset.etag()?;
        if request
            .if_none_match
            .as_deref()
            .is_some_and(|validator| validator.contains(&etag))
        {
            return Ok(Reply::not_modified());
        }

        let mime = asset.mime_type()?.to_string();
        let mut reader = asset.open()?;

        let mut reply = Reply::new(200).with_header("Content-Type", mime.as_str());
        if path == asset.permalink()? {
            reply = reply.with_header("Cache-Control", CACHE_FOREVER);
        }
        reply = reply.with_header("ETag", format!("\"{etag}\""));

        if mime::is_css(&mime) && self.css_filter.matches(asset) {
            let mut data = Vec::new();
            reader
                .read_to_end(&mut data)
                .map_err(|e| AssetError::unavailable(asset.path(), e))?;
            return Ok(reply.with_body(Body::Bytes(rewrite_css(self, &data))));
        }

        Ok(reply.with_body(Body::Stream(reader)))
    }

    fn server_error(&self, error: &AssetError) -> Reply {
        log!("error"; "{}", error);
        Reply::server_error(error.to_string())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("assets", &self.registry.len())
            .field("permalink_filter", &self.permalink_filter)
            .field("css_filter", &self.css_filter)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Reader;
    use crate::registry::{DirTree, MemoryTree};
    use std::fs;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const HELLO_ETAG: &str =
        "\"8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4\"";

    struct Response {
        status: u16,
        cache: String,
        etag: String,
        content_type: String,
        body: String,
    }

    fn test_registry() -> Registry {
        let mut registry = Registry::new();
        let tree = MemoryTree::new()
            .file("@test/hello.world", b"hi".to_vec())
            .file("main.css", b"body { background: url(bg.png); }".to_vec())
            .file("bg.png", b"\x89PNG\x0D\x0A\x1A\x0A".to_vec());
        registry.register_tree(&tree).unwrap();
        registry
    }

    fn fetch_with(gateway: &Gateway, request: AssetRequest) -> Response {
        let reply = gateway.handle(&request);
        let header = |name| reply.header(name).unwrap_or_default().to_string();
        let (cache, etag, content_type) = (
            header("Cache-Control"),
            header("ETag"),
            header("Content-Type"),
        );
        let status = reply.status;
        let body = String::from_utf8_lossy(&reply.into_bytes().unwrap()).into_owned();
        Response {
            status,
            cache,
            etag,
            content_type,
            body,
        }
    }

    fn fetch(gateway: &Gateway, path: &str) -> Response {
        fetch_with(gateway, AssetRequest::get(path))
    }

    #[test]
    fn test_not_found() {
        let gateway = Gateway::new(test_registry());
        let response = fetch(&gateway, "/not_found");
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "404 Not Found");
    }

    #[test]
    fn test_fallback() {
        let gateway = Gateway::new(test_registry())
            .with_fallback(|_: &AssetRequest| Reply::text(201, "next"));

        let response = fetch(&gateway, "/not_found");
        assert_eq!(response.status, 201);
        assert_eq!(response.body, "next");
    }

    #[test]
    fn test_by_path_and_permalink() {
        let gateway = Gateway::new(test_registry());
        let path = "/@test/hello.world";

        let response = fetch(&gateway, path);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "hi");
        assert_eq!(response.etag, HELLO_ETAG);
        assert_eq!(response.cache, "");
        assert_eq!(response.content_type, "text/plain; charset=utf-8");

        let perm = gateway.permalink(path);
        assert_eq!(perm, "/@test/hello-8f434346648f.world");

        let response = fetch(&gateway, &perm);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "hi");
        assert_eq!(response.etag, HELLO_ETAG);
        assert_eq!(response.cache, CACHE_FOREVER);
    }

    #[test]
    fn test_permalinks() {
        let gateway = Gateway::new(test_registry());
        assert_eq!(gateway.permalink("/not_found"), "/not_found");
        assert_eq!(
            gateway.permalink("/@test/hello.world"),
            "/@test/hello-8f434346648f.world"
        );
    }

    #[test]
    fn test_stale_permalink() {
        let gateway = Gateway::new(test_registry());
        let response = fetch(&gateway, "/@test/hello-000000000000.world");
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_etag_not_modified() {
        let gateway = Gateway::new(test_registry());
        let perm = gateway.permalink("/@test/hello.world");

        let response = fetch_with(
            &gateway,
            AssetRequest::get(perm.as_str()).with_if_none_match(HELLO_ETAG),
        );
        assert_eq!(response.status, 304);
        assert_eq!(response.cache, "");
        assert_eq!(response.etag, "");
        assert_eq!(response.body, "");

        // A list of validators also matches
        let response = fetch_with(
            &gateway,
            AssetRequest::get("/@test/hello.world")
                .with_if_none_match(format!("\"x\", {HELLO_ETAG}")),
        );
        assert_eq!(response.status, 304);

        let response = fetch_with(
            &gateway,
            AssetRequest::get(perm.as_str()).with_if_none_match("\"other\""),
        );
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_css_rewrite() {
        let gateway = Gateway::new(test_registry());
        let response = fetch(&gateway, "/main.css");
        assert_eq!(response.status, 200);
        assert!(response.body.contains("url(/bg-"), "{}", response.body);
        assert_eq!(response.content_type, "text/css; charset=utf-8");
    }

    #[test]
    fn test_css_rewrite_disabled_by_permalink_filter() {
        let gateway =
            Gateway::new(test_registry()).with_permalink_filter(Filter::new(|_| false));
        let response = fetch(&gateway, "/main.css");
        assert!(response.body.contains("bg.png"));

        // Permalink requests are refused too
        let perm = Gateway::new(test_registry()).permalink("/bg.png");
        assert_eq!(fetch(&gateway, &perm).status, 404);
        assert_eq!(gateway.permalink("/bg.png"), "/bg.png");
        assert_eq!(fetch(&gateway, "/bg.png").status, 200);
    }

    #[test]
    fn test_css_rewrite_keeps_latin1_bytes() {
        let mut registry = test_registry();
        registry.register_bytes(
            "/latin.css",
            b"a{content:\"\xe9\"} b{background:url(/bg.png)}".to_vec(),
        );
        let gateway = Gateway::new(registry);
        let perm = gateway.permalink("/bg.png");

        let reply = gateway.handle(&AssetRequest::get("/latin.css"));
        assert_eq!(reply.status, 200);
        let body = reply.into_bytes().unwrap();
        let expected = [
            b"a{content:\"\xe9\"} b{background:url(".as_slice(),
            perm.as_bytes(),
            b")}",
        ]
        .concat();
        assert_eq!(body, expected);
    }

    #[test]
    fn test_css_rewrite_disabled_by_css_filter() {
        let gateway = Gateway::new(test_registry()).with_css_filter(Filter::none());
        let response = fetch(&gateway, "/main.css");
        assert_eq!(response.body, "body { background: url(bg.png); }");
    }

    #[test]
    fn test_open_failure_is_500() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opens);
        let mut registry = Registry::new();
        registry.register(
            "/flaky.txt",
            move || -> io::Result<Reader> {
                // First open (hashing) succeeds, later opens fail
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(Box::new(io::Cursor::new(b"ok".to_vec())))
                } else {
                    Err(io::Error::other("disk on fire"))
                }
            },
            None,
        );
        let gateway = Gateway::new(registry);

        let response = fetch(&gateway, "/flaky.txt");
        assert_eq!(response.status, 500);
        assert!(response.body.contains("disk on fire"), "{}", response.body);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_init_failure_is_500() {
        let mut registry = Registry::new();
        registry.register(
            "/broken.css",
            || -> io::Result<Reader> { Err(io::Error::other("missing")) },
            None,
        );
        let response = fetch(&Gateway::new(registry), "/broken.css");
        assert_eq!(response.status, 500);
        assert!(response.body.contains("/broken.css"));
    }

    #[test]
    fn test_serve_dir_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("test_assets");
        fs::create_dir_all(root.join("@test")).unwrap();
        fs::write(root.join("@test/hello.world"), "hi").unwrap();
        fs::write(root.join("main.css"), "a { background: url('/bg.png') }").unwrap();
        fs::write(root.join("bg.png"), "").unwrap();

        let mut registry = Registry::new();
        registry.register_tree(&DirTree::new(dir.path()).sub("test_assets")).unwrap();
        let gateway = Gateway::new(registry);

        let response = fetch(&gateway, "/@test/hello.world");
        assert_eq!(response.body, "hi");
        assert_eq!(response.etag, HELLO_ETAG);

        let response = fetch(&gateway, "/main.css");
        assert_eq!(response.body, "a { background: url('/bg-e3b0c44298fc.png') }");
    }

    #[test]
    fn test_relative_request_path() {
        let gateway = Gateway::new(test_registry());
        assert_eq!(fetch(&gateway, "@test/hello.world").status, 200);
    }

    #[test]
    fn test_concurrent_requests() {
        let gateway = Gateway::new(test_registry());
        let perm = gateway.permalink("/main.css");
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let response = fetch(&gateway, &perm);
                    assert_eq!(response.status, 200);
                    assert_eq!(response.cache, CACHE_FOREVER);
                });
            }
        });
    }
}
