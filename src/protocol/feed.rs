//! Remote time-series push.
//!
//! One HTTP/1.1 `PUT` per report period, CSV datapoints in the body:
//! ```text
//! PUT /v2/feeds/<feedid>.csv HTTP/1.1
//! Host: <host>
//! X-ApiKey: <apikey>
//! Content-Length: <n>
//! Connection: close
//!
//! voltage,<V>
//! current,<I>
//! power,<P>
//! switch,<0|1>
//! ```
//! The endpoint comes from `feedsurl` on URL-addressed variants and from
//! `host`/`port` on the Ethernet variant.  Only plain `http://` URLs are
//! understood.

use core::fmt::Write;

use heapless::String;

use crate::config::{Addressing, BuildProfile};
use crate::error::CommsError;
use crate::measure::Reading;
use crate::settings::{FEEDSURL_LEN, Settings};

/// Request buffer capacity (headers + body).
pub const REQUEST_CAP: usize = 512;
const BODY_CAP: usize = 128;

/// Path used when the endpoint is addressed by host + port.
const FIXED_PATH: &str = "/v2/feeds/";

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    pub host: String<FEEDSURL_LEN>,
    pub port: u16,
}

/// A fully rendered request, ready to write to a socket.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub endpoint: FeedEndpoint,
    pub request: String<REQUEST_CAP>,
}

/// Split an `http://host[:port]/path` URL.
pub fn parse_url(url: &str) -> Option<(&str, u16, &str)> {
    let rest = url.strip_prefix("http://")?;
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => (h, p.parse().ok().filter(|&p: &u16| p != 0)?),
        None => (authority, 80),
    };
    if host.is_empty() {
        return None;
    }
    Some((host, port, path))
}

/// Render the push request for `reading`.
pub fn build_request(
    reading: &Reading,
    settings: &Settings,
    profile: &BuildProfile,
) -> Result<FeedRequest, CommsError> {
    let mut host_buf: String<FEEDSURL_LEN> = String::new();
    let (port, path) = match profile.addressing() {
        Addressing::HostPort => {
            write!(host_buf, "{}", settings.host_addr()).map_err(|_| CommsError::Overflow)?;
            (settings.port, FIXED_PATH)
        }
        Addressing::Url => {
            let (host, port, path) =
                parse_url(&settings.feedsurl).ok_or(CommsError::AddressUnresolved)?;
            host_buf.push_str(host).map_err(|_| CommsError::Overflow)?;
            (port, path)
        }
        Addressing::None => return Err(CommsError::AddressUnresolved),
    };

    let mut body: String<BODY_CAP> = String::new();
    write!(
        body,
        "voltage,{:.3}\ncurrent,{:.3}\npower,{:.2}\nswitch,{}\n",
        reading.voltage,
        reading.current,
        reading.power,
        u8::from(reading.relay_high)
    )
    .map_err(|_| CommsError::Overflow)?;

    let mut request: String<REQUEST_CAP> = String::new();
    write!(
        request,
        "PUT {}{}.csv HTTP/1.1\r\n\
         Host: {}\r\n\
         X-ApiKey: {}\r\n\
         User-Agent: Energino\r\n\
         Content-Type: text/csv\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        path,
        settings.feedid,
        host_buf,
        settings.apikey,
        body.len(),
        body
    )
    .map_err(|_| CommsError::Overflow)?;

    Ok(FeedRequest {
        endpoint: FeedEndpoint {
            host: host_buf,
            port,
        },
        request,
    })
}
