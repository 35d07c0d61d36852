//! Client address resolution.

use std::net::SocketAddr;

use http::HeaderMap;

/// Client host and port as seen by the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientAddr {
    /// Client host, from proxy headers or the transport peer.
    pub ip: String,
    /// Transport peer port, empty when the peer is unknown.
    pub port: String,
}

impl ClientAddr {
    /// Resolve the client address.
    ///
    /// The host is taken from `X-Real-Ip`, then the first `X-Forwarded-For`
    /// entry, then the peer address. The port always comes from the peer.
    #[must_use]
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = header_str(headers, "x-real-ip").or_else(|| {
            header_str(headers, "x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        });

        let ip = match (forwarded, peer) {
            (Some(host), _) => strip_port(host).to_owned(),
            (None, Some(addr)) => addr.ip().to_string(),
            (None, None) => String::new(),
        };
        let port = peer.map(|addr| addr.port().to_string()).unwrap_or_default();

        Self { ip, port }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Drop a trailing `:port` from `host:port` and `[v6]:port` forms.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split_once(']').map_or(host, |(ip, _)| ip);
    }
    match host.split_once(':') {
        // A single colon is a port separator; more than one is a bare IPv6.
        Some((ip, port)) if !port.contains(':') => ip,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.9:51234".parse().unwrap())
    }

    #[test]
    fn test_should_prefer_real_ip_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.7".parse().unwrap());
        headers.insert("x-forwarded-for", "198.51.100.1".parse().unwrap());
        let addr = ClientAddr::resolve(&headers, peer());
        assert_eq!(addr.ip, "203.0.113.7");
        assert_eq!(addr.port, "51234");
    }

    #[test]
    fn test_should_take_first_forwarded_for_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "198.51.100.1:8080, 10.1.1.1".parse().unwrap(),
        );
        let addr = ClientAddr::resolve(&headers, peer());
        assert_eq!(addr.ip, "198.51.100.1");
    }

    #[test]
    fn test_should_fall_back_to_peer() {
        let addr = ClientAddr::resolve(&HeaderMap::new(), peer());
        assert_eq!(addr.ip, "10.0.0.9");
        assert_eq!(addr.port, "51234");
    }

    #[test]
    fn test_should_be_empty_without_any_source() {
        assert_eq!(
            ClientAddr::resolve(&HeaderMap::new(), None),
            ClientAddr::default()
        );
    }

    #[test]
    fn test_should_strip_ports_from_forwarded_hosts() {
        assert_eq!(strip_port("[::1]:80"), "::1");
        assert_eq!(strip_port("::1"), "::1");
        assert_eq!(strip_port("1.2.3.4"), "1.2.3.4");
    }
}
