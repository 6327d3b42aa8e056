//! tiny_http bridge: binding, request loop and reply writing.

use std::io::Cursor;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Request, Response, Server, StatusCode};

use super::{AssetRequest, Body, Gateway, Reply};
use crate::asset::Reader;
use crate::{debug, log, state};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

/// Bind the HTTP server and register it for Ctrl+C shutdown
pub fn bind(interface: IpAddr, port: u16) -> Result<BoundServer> {
    let (server, addr) = bind_with_retry(interface, port)?;
    let server = Arc::new(server);
    state::register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    Ok(BoundServer { server, addr })
}

impl BoundServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve requests on `workers` threads until shutdown (blocking).
    pub fn run(self, gateway: Arc<Gateway>, workers: usize) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("assetlink-worker-{i}"))
            .build()?;

        for request in self.server.incoming_requests() {
            let gateway = Arc::clone(&gateway);
            pool.spawn(move || {
                if let Err(e) = respond(&gateway, request) {
                    log!("serve"; "request error: {e}");
                }
            });
        }
        Ok(())
    }
}

/// Answer one request through the gateway.
pub fn respond(gateway: &Gateway, request: Request) -> Result<()> {
    if state::is_shutdown() {
        let reply = Reply::text(503, "503 Service Unavailable");
        return request.respond(into_response(reply)?).map_err(Into::into);
    }

    let asset_request = asset_request(&request);
    let reply = gateway.handle(&asset_request);
    debug!("serve"; "{} {} -> {}", request.method(), asset_request.path, reply.status);

    // tiny_http writes HEAD responses with the GET headers and no body
    request.respond(into_response(reply)?)?;
    Ok(())
}

fn asset_request(request: &Request) -> AssetRequest {
    let if_none_match = request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case("if-none-match"))
        .map(|h| h.value.to_string());

    AssetRequest {
        path: request_path(request.url()),
        if_none_match,
    }
}

/// Strip the query string, then percent-decode.
fn request_path(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

fn into_response(reply: Reply) -> Result<Response<Reader>> {
    let headers = reply
        .headers
        .iter()
        .map(|(name, value)| make_header(name, value))
        .collect::<Result<Vec<_>>>()?;

    let (data, length): (Reader, Option<usize>) = match reply.body {
        Body::Empty => (Box::new(std::io::empty()), Some(0)),
        Body::Bytes(bytes) => {
            let len = bytes.len();
            (Box::new(Cursor::new(bytes)), Some(len))
        }
        Body::Stream(reader) => (reader, None),
    };

    Ok(Response::new(
        StatusCode(reply.status),
        headers,
        data,
        length,
        None,
    ))
}

fn make_header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header {name}: {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};
    use std::thread;

    fn drain(mut reader: impl Read) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        buf
    }

    fn content_length(response: &str) -> Option<&str> {
        response
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim())
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/main.css"), "/main.css");
        assert_eq!(request_path("/main.css?v=1"), "/main.css");
        assert_eq!(request_path("/a%20b.png"), "/a b.png");
        assert_eq!(request_path("/@test/hello.world#top"), "/@test/hello.world");
        assert_eq!(request_path("/caf%C3%A9.css?x=%20"), "/café.css");
    }

    #[test]
    fn test_into_response() {
        let reply = Reply::text(404, "404 Not Found");
        let response = into_response(reply).unwrap();
        assert_eq!(response.status_code(), StatusCode(404));

        let reply = Reply::new(200).with_header("ETag", "\"abc\"");
        let response = into_response(reply).unwrap();
        assert_eq!(response.status_code(), StatusCode(200));
    }

    #[test]
    fn test_make_header() {
        assert!(make_header("Cache-Control", "public, max-age=31536000").is_ok());
        assert!(make_header("Content-Type", "caf\u{e9}").is_err());
    }

    #[test]
    fn test_bind_with_retry_skips_taken_port() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (taken, addr) = bind_with_retry(localhost, 0).unwrap();
        let port = taken.server_addr().to_ip().unwrap().port();
        assert_eq!(addr.port(), 0);

        let (_server, addr) = bind_with_retry(localhost, port).unwrap();
        assert_ne!(addr.port(), port);
    }

    #[test]
    fn test_respond_over_socket() {
        let mut registry = Registry::new();
        registry.register_bytes("/@test/hello.world", b"hi".to_vec());
        let gateway = Gateway::new(registry);
        let permalink = gateway.permalink("/@test/hello.world");

        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();

        let handle = thread::spawn(move || {
            for _ in 0..3 {
                let request = server.recv().unwrap();
                respond(&gateway, request).unwrap();
            }
        });

        let fetch = |method: &str, path: &str| {
            let mut stream = TcpStream::connect(addr).unwrap();
            write!(stream, "{method} {path} HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();
            String::from_utf8(drain(stream)).unwrap()
        };

        let response = fetch("GET", &format!("{permalink}?cache=1"));
        assert!(response.starts_with("HTTP/1.0 200") || response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("public, max-age=31536000"), "{response}");
        assert!(response.ends_with("\r\n\r\nhi"), "{response}");

        let get = fetch("GET", "/@test/hello.world");
        assert_eq!(content_length(&get), Some("2"), "{get}");

        let head = fetch("HEAD", "/@test/hello.world");
        assert!(head.contains(" 200 "), "{head}");
        assert!(head.ends_with("\r\n\r\n"), "{head}");
        assert_eq!(content_length(&head), content_length(&get), "{head}");

        handle.join().unwrap();
    }
}
