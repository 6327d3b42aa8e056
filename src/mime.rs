//! MIME type lookup and content sniffing.
//!
//! [`from_path`] is the registration-time hint (extension table). When it
//! has no answer, [`sniff`] inspects the first bytes of the content during
//! asset initialization.

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "text/xml; charset=utf-8";
    pub const MARKDOWN: &str = "text/markdown; charset=utf-8";
    pub const CSV: &str = "text/csv; charset=utf-8";
    pub const PLAIN_UTF16BE: &str = "text/plain; charset=utf-16be";
    pub const PLAIN_UTF16LE: &str = "text/plain; charset=utf-16le";

    // Web feeds
    pub const RSS: &str = "application/rss+xml";
    pub const ATOM: &str = "application/atom+xml";
    pub const MANIFEST: &str = "application/manifest+json";

    // Documents
    pub const PDF: &str = "application/pdf";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";
    pub const ZIP: &str = "application/zip";
    pub const GZIP: &str = "application/x-gzip";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";
    pub const BMP: &str = "image/bmp";

    // Audio / video
    pub const MP3: &str = "audio/mpeg";
    pub const OGG: &str = "audio/ogg";
    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
}

/// Guess MIME type from the extension of a logical path.
///
/// Returns `None` for unknown or missing extensions so the caller can fall
/// back to [`sniff`].
pub fn from_path(path: &str) -> Option<&'static str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = name.rfind('.').map(|i| &name[i + 1..])?;
    from_extension(&ext.to_ascii_lowercase())
}

/// Guess MIME type from a lowercase extension (without the dot).
pub fn from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        // Web / Text
        "html" | "htm" => types::HTML,
        "css" => types::CSS,
        "js" | "mjs" | "cjs" => types::JAVASCRIPT,
        "json" | "map" => types::JSON,
        "xml" => types::XML,
        "md" => types::MARKDOWN,
        "csv" => types::CSV,
        "txt" => types::PLAIN,

        // Web feeds
        "rss" => types::RSS,
        "atom" => types::ATOM,
        "webmanifest" => types::MANIFEST,

        // Images
        "svg" => types::SVG,
        "png" => types::PNG,
        "jpg" | "jpeg" => types::JPEG,
        "gif" => types::GIF,
        "webp" => types::WEBP,
        "avif" => types::AVIF,
        "ico" => types::ICO,
        "bmp" => types::BMP,

        // Audio / video
        "mp3" => types::MP3,
        "ogg" | "oga" => types::OGG,
        "mp4" | "m4v" => types::MP4,
        "webm" => types::WEBM,

        // Fonts
        "woff" => types::WOFF,
        "woff2" => types::WOFF2,
        "ttf" => types::TTF,
        "otf" => types::OTF,

        // Documents / Binary
        "pdf" => types::PDF,
        "wasm" => types::WASM,
        "zip" => types::ZIP,
        "gz" => types::GZIP,

        _ => return None,
    };
    Some(mime)
}

/// Bytes considered by [`sniff`].
const SNIFF_LEN: usize = 512;

/// HTML tags recognised at the start of a document (case-insensitive).
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Exact-prefix binary signatures.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", types::PDF),
    (b"\x89PNG\x0D\x0A\x1A\x0A", types::PNG),
    (b"\xFF\xD8\xFF", types::JPEG),
    (b"GIF87a", types::GIF),
    (b"GIF89a", types::GIF),
    (b"BM", types::BMP),
    (b"\x00\x00\x01\x00", types::ICO),
    (b"\x00asm", types::WASM),
    (b"\x1F\x8B\x08", types::GZIP),
    (b"PK\x03\x04", types::ZIP),
    (b"wOFF", types::WOFF),
    (b"wOF2", types::WOFF2),
    (b"OggS\x00", types::OGG),
    (b"ID3", types::MP3),
    (b"\x1A\x45\xDF\xA3", types::WEBM),
];

/// Detect a MIME type from content.
///
/// Follows the WHATWG sniffing order: byte-order marks, markup, binary
/// signatures, then plain text versus opaque binary. Always returns a value.
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    if data.starts_with(b"\xFE\xFF") {
        return types::PLAIN_UTF16BE;
    }
    if data.starts_with(b"\xFF\xFE") {
        return types::PLAIN_UTF16LE;
    }
    if data.starts_with(b"\xEF\xBB\xBF") {
        return types::PLAIN;
    }

    let trimmed = trim_leading_whitespace(data);
    if HTML_TAGS.iter().any(|tag| is_html_tag(trimmed, tag)) {
        return types::HTML;
    }
    if trimmed.starts_with(b"<?xml") {
        return types::XML;
    }

    if let Some((_, mime)) = SIGNATURES.iter().find(|(sig, _)| data.starts_with(sig)) {
        return mime;
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return types::WEBP;
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return match &data[8..12] {
            b"avif" | b"avis" => types::AVIF,
            _ => types::MP4,
        };
    }

    if data.iter().any(|&b| is_binary_byte(b)) {
        types::OCTET_STREAM
    } else {
        types::PLAIN
    }
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

/// A tag matches when followed by a space or `>`.
fn is_html_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() <= tag.len() {
        return false;
    }
    let head_matches = data
        .iter()
        .zip(tag)
        .all(|(d, t)| d.to_ascii_uppercase() == *t);
    head_matches && matches!(data[tag.len()], b' ' | b'>')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

/// Check if the MIME type is a stylesheet.
pub fn is_css(mime: &str) -> bool {
    mime.starts_with("text/css")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path("/index.html"), Some(types::HTML));
        assert_eq!(from_path("/asdf.css"), Some(types::CSS));
        assert_eq!(from_path("app.js"), Some(types::JAVASCRIPT));
        assert_eq!(from_path("/img/logo.PNG"), Some(types::PNG));
        assert_eq!(from_path("/fonts/inter.woff2"), Some(types::WOFF2));
        assert_eq!(from_path("/@test/hello.world"), None);
        assert_eq!(from_path("/data/asdf"), None);
        assert_eq!(from_path("/v1.2/asdf"), None);
    }

    #[test]
    fn test_sniff_text() {
        assert_eq!(sniff(b""), types::PLAIN);
        assert_eq!(sniff(b"hi"), types::PLAIN);
        assert_eq!(sniff(b"\xEF\xBB\xBFhi"), types::PLAIN);
        assert_eq!(sniff(b"\xFF\xFEh\x00"), types::PLAIN_UTF16LE);
    }

    #[test]
    fn test_sniff_markup() {
        assert_eq!(sniff(b"<!doctype html><p>x"), types::HTML);
        assert_eq!(sniff(b"\n  <html>"), types::HTML);
        assert_eq!(sniff(b"<p>hello</p>"), types::HTML);
        assert_eq!(sniff(b"<?xml version=\"1.0\"?>"), types::XML);
        // `<Bogus` is not a known tag
        assert_eq!(sniff(b"<Bogus>"), types::PLAIN);
    }

    #[test]
    fn test_sniff_binary() {
        assert_eq!(sniff(b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00"), types::PNG);
        assert_eq!(sniff(b"\xFF\xD8\xFF\xE0"), types::JPEG);
        assert_eq!(sniff(b"GIF89a..."), types::GIF);
        assert_eq!(sniff(b"RIFF\x00\x00\x00\x00WEBPVP8 "), types::WEBP);
        assert_eq!(sniff(b"%PDF-1.7"), types::PDF);
        assert_eq!(sniff(b"\x00asm\x01\x00\x00\x00"), types::WASM);
        assert_eq!(sniff(b"\x01\x02\x03"), types::OCTET_STREAM);
    }

    #[test]
    fn test_is_css() {
        assert!(is_css(types::CSS));
        assert!(is_css("text/css"));
        assert!(!is_css(types::HTML));
    }
}
