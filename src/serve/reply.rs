//! Transport-neutral request and response values.
//!
//! The gateway speaks in these types so it can be driven without a socket;
//! [`super::http`] converts them to and from `tiny_http`.

use std::fmt;
use std::io::{self, Read};

use crate::asset::Reader;
use crate::mime::types::PLAIN;

/// The parts of an HTTP request the gateway looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetRequest {
    /// Decoded request path without query string.
    pub path: String,
    /// Raw `If-None-Match` header value.
    pub if_none_match: Option<String>,
}

impl AssetRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            if_none_match: None,
        }
    }

    pub fn with_if_none_match(mut self, value: impl Into<String>) -> Self {
        self.if_none_match = Some(value.into());
        self
    }
}

/// Response body.
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Streamed straight from the content source.
    Stream(Reader),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A response ready to be written by the transport.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Body,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// 304 with no headers and no body.
    pub fn not_modified() -> Self {
        Self::new(304)
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    /// 500 with the error text as body.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::text(500, message)
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("Content-Type", PLAIN)
            .with_body(Body::Bytes(body.into().into_bytes()))
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// First value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Drain the body into memory.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self.body {
            Body::Empty => Ok(Vec::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}
