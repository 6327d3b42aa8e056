//! Permalink encoding: `/css/main.css` + `b221d9dbb083` → `/css/main-b221d9dbb083.css`.
//!
//! The hash is inserted before the extension of the final path segment.
//! Paths without an extension get the hash appended after a dash.

use thiserror::Error;

/// The candidate path carries no decodable hash segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("path without hash")]
pub struct NoHash;

/// A permalink split back into its logical path and embedded hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<'a> {
    pub path: String,
    pub hash: &'a str,
}

/// Split a path into directory part (including the trailing `/`) and basename.
fn split_basename(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    }
}

/// Extension of a basename, including the leading dot (empty if none).
fn extension(basename: &str) -> &str {
    basename.rfind('.').map_or("", |i| &basename[i..])
}

/// Insert `-{hash}` before the extension of the final path segment.
pub fn encode(path: &str, hash: &str) -> String {
    let (dir, name) = split_basename(path);
    let ext = extension(name);
    let stem = &name[..name.len() - ext.len()];
    format!("{dir}{stem}-{hash}{ext}")
}

/// Recover the logical path and hash from a permalink.
///
/// Fails with [`NoHash`] when the basename has no `-`, when the `-` is its
/// last character, or when the extension starts before the last `-` (such a
/// basename can never come out of [`encode`]).
pub fn decode(permalink: &str) -> Result<Decoded<'_>, NoHash> {
    let (dir, name) = split_basename(permalink);
    let dash = name.rfind('-').ok_or(NoHash)?;
    if dash == name.len() - 1 {
        return Err(NoHash);
    }

    let ext = extension(name);
    let ext_start = name.len() - ext.len();
    if ext_start <= dash {
        return Err(NoHash);
    }

    Ok(Decoded {
        path: format!("{dir}{}{ext}", &name[..dash]),
        hash: &name[dash + 1..ext_start],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decoded(permalink: &str) -> (String, String) {
        let d = decode(permalink).unwrap();
        (d.path, d.hash.to_string())
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("/asdf.css", "b221d9dbb083"), "/asdf-b221d9dbb083.css");
        assert_eq!(
            encode("/@test/hello.world", "8f434346648f"),
            "/@test/hello-8f434346648f.world"
        );
        assert_eq!(encode("/data/asdf", "123"), "/data/asdf-123");
        assert_eq!(encode("/lib.min.js", "abc"), "/lib.min-abc.js");
        assert_eq!(encode("/v1.2/asdf", "abc"), "/v1.2/asdf-abc");
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            decoded("asdf-123asdf.js"),
            ("asdf.js".into(), "123asdf".into())
        );
        assert_eq!(
            decoded("/js/asdf-zxcv.js"),
            ("/js/asdf.js".into(), "zxcv".into())
        );
        assert_eq!(decoded("/data/asdf-123"), ("/data/asdf".into(), "123".into()));
        assert_eq!(
            decoded("/fonts/Inter-Bold-abc.woff2"),
            ("/fonts/Inter-Bold.woff2".into(), "abc".into())
        );
    }

    #[test]
    fn test_decode_no_hash() {
        assert_eq!(decode("hello.world"), Err(NoHash));
        assert_eq!(decode("asdf-"), Err(NoHash));
        assert_eq!(decode("/data/asdf-"), Err(NoHash));
        assert_eq!(decode("/my-dir/file.css"), Err(NoHash));
        assert_eq!(decode("/a.b-123"), Err(NoHash));
        assert_eq!(decode(""), Err(NoHash));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            dir in "(/[a-z0-9_@]{1,8}){0,3}",
            stem in "[a-zA-Z0-9_.-]{0,10}[a-zA-Z0-9_]",
            ext in "(\\.[a-z0-9]{1,5})?",
            hash in "[0-9a-f]{12}",
        ) {
            let path = format!("{dir}/{stem}{ext}");
            prop_assume!(extension(&format!("{stem}{ext}")) == ext);
            let permalink = encode(&path, &hash);
            let d = decode(&permalink).unwrap();
            prop_assert_eq!(d.path, path);
            prop_assert_eq!(d.hash, hash.as_str());
        }
    }
}
