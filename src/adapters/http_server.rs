//! HTTP datastreams server adapter.
//!
//! A non-blocking TCP listener polled from the main loop.  Each poll
//! accepts whatever clients are waiting, reads one request line per
//! connection, hands method + path to a handler (the service) and writes
//! the rendered response before closing.  Routing and rendering live in
//! [`protocol::http`](crate::protocol::http).
//!
//! ## Connection model
//!
//! 1. `bind()` opens a listener on `0.0.0.0:<port>` in non-blocking mode.
//! 2. `poll()` accepts up to [`MAX_CLIENTS_PER_POLL`] connections.
//! 3. Each accepted socket gets a short read timeout; a client that
//!    sends nothing usable is dropped without a response.
//! 4. One request per connection (`Connection: close`).

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::CommsError;
use crate::protocol::http::HttpResponse;

/// Connections served per main-loop iteration.
pub const MAX_CLIENTS_PER_POLL: usize = 4;

/// Bytes read while looking for the request line.
const REQUEST_HEAD_CAP: usize = 512;

const CLIENT_TIMEOUT: Duration = Duration::from_millis(250);

pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    /// Bind on `0.0.0.0:<port>`.  Port `0` lets the OS pick one
    /// (see [`local_addr`](Self::local_addr)).
    pub fn bind(port: u16) -> Result<Self, CommsError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).map_err(|_| CommsError::BindFailed)?;
        listener
            .set_nonblocking(true)
            .map_err(|_| CommsError::BindFailed)?;
        info!("HTTP: listening on port {}", port);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Serve every waiting client.  Returns the number of responses sent.
    pub fn poll(&mut self, mut handler: impl FnMut(&str, &str) -> HttpResponse) -> usize {
        let mut served = 0;
        for _ in 0..MAX_CLIENTS_PER_POLL {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!("HTTP: client {}", peer);
                    if serve(stream, &mut handler) {
                        served += 1;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("HTTP: accept error: {}", e);
                    break;
                }
            }
        }
        served
    }
}

fn serve(mut stream: TcpStream, handler: &mut impl FnMut(&str, &str) -> HttpResponse) -> bool {
    if stream.set_nonblocking(false).is_err()
        || stream.set_read_timeout(Some(CLIENT_TIMEOUT)).is_err()
        || stream.set_write_timeout(Some(CLIENT_TIMEOUT)).is_err()
    {
        return false;
    }

    let mut head = [0u8; REQUEST_HEAD_CAP];
    let mut filled = 0;
    while filled < head.len() && !head[..filled].contains(&b'\n') {
        match stream.read(&mut head[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }

    let Some((method, path)) = parse_request_line(&head[..filled]) else {
        debug!("HTTP: no request line, closing");
        return false;
    };
    let response = handler(method, path);
    debug!("HTTP: {} {} -> {}", method, path, response.status as u16);
    match stream.write_all(response.to_wire().as_bytes()) {
        Ok(()) => {
            let _ = stream.flush();
            true
        }
        Err(e) => {
            warn!("HTTP: write failed: {}", e);
            false
        }
    }
}

/// Method and path from `"<METHOD> <PATH> HTTP/1.x"`.
pub fn parse_request_line(head: &[u8]) -> Option<(&str, &str)> {
    let end = head.iter().position(|&b| b == b'\n')?;
    let line = core::str::from_utf8(&head[..end]).ok()?.trim_end_matches('\r');
    let mut parts = line.split(' ');
    let method = parts.next().filter(|m| !m.is_empty())?;
    let path = parts.next().filter(|p| p.starts_with('/'))?;
    Some((method, path))
}
