//! Remote feed client.
//!
//! [`TcpFeedClient`] implements [`FeedPort`] with a plain TCP connection
//! per push: resolve, connect, write the rendered request, close.  The
//! connect and the write are bounded by the profile's feed timeout.
//! ESP-IDF's lwIP socket layer backs `std::net` on the device, so one
//! implementation serves both targets.
//!
//! Name resolution has no timeout of its own in `std::net`; it blocks for
//! as long as the system resolver does.  IPv4 literals skip it, and a
//! hostname is looked up once and then reused until the endpoint changes
//! or a connect to the cached address fails.

use std::io::Write;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use crate::app::ports::FeedPort;
use crate::error::CommsError;
use crate::protocol::feed::{FeedEndpoint, FeedRequest};

/// Fire-and-forget HTTP push over TCP.
#[derive(Debug, Clone)]
pub struct TcpFeedClient {
    timeout: Duration,
    resolved: Option<(FeedEndpoint, SocketAddr)>,
}

impl TcpFeedClient {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout: Duration::from_millis(u64::from(timeout_ms.max(1))),
            resolved: None,
        }
    }

    /// Address kept from the last hostname lookup, if any.
    pub fn cached_addr(&self) -> Option<SocketAddr> {
        self.resolved.as_ref().map(|(_, addr)| *addr)
    }

    fn resolve(&mut self, endpoint: &FeedEndpoint) -> Result<SocketAddr, CommsError> {
        if let Ok(ip) = endpoint.host.parse::<Ipv4Addr>() {
            return Ok(SocketAddr::from((ip, endpoint.port)));
        }
        if let Some((cached, addr)) = &self.resolved {
            if cached == endpoint {
                return Ok(*addr);
            }
        }
        let addr = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|_| CommsError::AddressUnresolved)?
            .next()
            .ok_or(CommsError::AddressUnresolved)?;
        debug!("Feed: resolved {} to {}", endpoint.host, addr);
        self.resolved = Some((endpoint.clone(), addr));
        Ok(addr)
    }
}

fn io_to_comms(e: &std::io::Error, otherwise: CommsError) -> CommsError {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => CommsError::Timeout,
        _ => otherwise,
    }
}

impl FeedPort for TcpFeedClient {
    fn push(&mut self, request: &FeedRequest) -> Result<(), CommsError> {
        let addr = self.resolve(&request.endpoint)?;
        let mut stream = match TcpStream::connect_timeout(&addr, self.timeout) {
            Ok(stream) => stream,
            Err(e) => {
                self.resolved = None;
                return Err(io_to_comms(&e, CommsError::ConnectFailed));
            }
        };
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|_| CommsError::ConnectFailed)?;
        stream
            .write_all(request.request.as_bytes())
            .map_err(|e| io_to_comms(&e, CommsError::WriteFailed))?;
        let _ = stream.flush();
        let _ = stream.shutdown(Shutdown::Both);
        debug!("Feed: {} bytes to {}", request.request.len(), addr);
        Ok(())
    }
}
