//! Stylesheet rewriting: `url(bg.png)` → `url(/bg-e3b0c44298fc.png)`.
//!
//! Works on raw bytes so stylesheets in any ASCII-compatible encoding pass
//! through unchanged outside the rewritten references.

use std::str;
use std::sync::LazyLock;

use regex::bytes::Regex;

use super::Gateway;

/// `url(...)` with optional quotes and leading whitespace inside the parens.
static URL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?-u)url\([\s'"]*([^'"\)]+)[ '"]*\)"#).expect("valid url() regex")
});

/// Replace every `url(...)` reference to an eligible registered asset with
/// its permalink. All other bytes are copied verbatim, as are references
/// that are not valid UTF-8.
pub fn rewrite_css(gateway: &Gateway, css: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(css.len());
    let mut last = 0;

    for caps in URL_REF.captures_iter(css) {
        let Some(target) = caps.get(1) else { continue };
        out.extend_from_slice(&css[last..target.start()]);

        let permalink = str::from_utf8(target.as_bytes())
            .ok()
            .and_then(|path| gateway.eligible_permalink(path));
        match permalink {
            Some(permalink) => out.extend_from_slice(permalink.as_bytes()),
            None => out.extend_from_slice(target.as_bytes()),
        }
        last = target.end();
    }

    out.extend_from_slice(&css[last..]);
    out
}
