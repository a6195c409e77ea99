use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};

use crate::error::{Result, TunerError};

/// Default RTSP control port (RFC 2326 §3.2).
pub const DEFAULT_RTSP_PORT: u16 = 554;

/// Pick the local address RTSP sockets bind to.
///
/// A configured discovery address always wins. Otherwise the text between
/// `://` and the first `:` of the advertised base URL is used, but only
/// when it is a dotted-quad IPv4 literal; hostnames are never resolved
/// to guess an interface.
///
/// ```
/// use std::net::Ipv4Addr;
/// use tuner::transport::address::resolve_local_bind_address;
///
/// let addr = resolve_local_bind_address(None, "http://192.168.1.20:5004");
/// assert_eq!(addr, Some(Ipv4Addr::new(192, 168, 1, 20)));
///
/// assert_eq!(resolve_local_bind_address(None, "http://tuner.local:5004"), None);
/// ```
pub fn resolve_local_bind_address(
    configured: Option<Ipv4Addr>,
    advertised_base_url: &str,
) -> Option<Ipv4Addr> {
    if configured.is_some() {
        return configured;
    }

    let (_, rest) = advertised_base_url.split_once("://")?;
    let host = rest.split(':').next()?;
    if !is_dotted_quad(host) {
        tracing::debug!(host, "advertised host is not an IPv4 literal");
        return None;
    }
    host.parse().ok()
}

/// Exactly four dot-separated groups of one to three ASCII digits.
fn is_dotted_quad(host: &str) -> bool {
    let groups: Vec<&str> = host.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Parse the bind address of a bare RTP URL (`rtp://host:port`).
///
/// Accepts the `rtp://@group:port` form and ignores any trailing path.
/// A non-literal host is resolved and its first IPv4 address used.
pub fn parse_rtp_url(url: &str) -> Result<SocketAddrV4> {
    let (host, port) = split_authority(url, "rtp")?;
    let port = port.ok_or_else(|| TunerError::InvalidUrl(format!("{url}: missing port")))?;
    resolve_v4(host, port).ok_or_else(|| TunerError::InvalidUrl(format!("{url}: unresolvable host")))
}

/// Control endpoint implied by an `rtsp://host[:port]/path` URL.
pub fn parse_rtsp_authority(url: &str) -> Result<(String, u16)> {
    let (host, port) = split_authority(url, "rtsp")?;
    Ok((host.to_string(), port.unwrap_or(DEFAULT_RTSP_PORT)))
}

/// Resolve `host:port` to the first IPv4 socket address.
pub fn resolve_v4(host: &str, port: u16) -> Option<SocketAddrV4> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Some(SocketAddrV4::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .ok()?
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
}

fn split_authority<'a>(url: &'a str, scheme: &str) -> Result<(&'a str, Option<u16>)> {
    let url = url.trim();
    let rest = url
        .split_once("://")
        .filter(|(s, _)| s.eq_ignore_ascii_case(scheme))
        .map(|(_, rest)| rest)
        .ok_or_else(|| TunerError::InvalidUrl(format!("{url}: expected {scheme}://")))?;

    let authority = rest.split('/').next().unwrap_or_default();
    // Userinfo (including the empty one in `rtp://@group:port`) is not
    // used for addressing.
    let authority = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| TunerError::InvalidUrl(format!("{url}: invalid port {port:?}")))?;
            Ok((host, Some(port)))
        }
        None if !authority.is_empty() => Ok((authority, None)),
        None => Err(TunerError::InvalidUrl(format!("{url}: missing host"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_address_wins() {
        let configured = Some(Ipv4Addr::new(10, 1, 1, 1));
        assert_eq!(
            resolve_local_bind_address(configured, "http://192.168.1.20:5004"),
            configured
        );
        assert_eq!(resolve_local_bind_address(configured, ""), configured);
    }

    #[test]
    fn base_url_literal() {
        assert_eq!(
            resolve_local_bind_address(None, "http://192.168.1.20:5004"),
            Some(Ipv4Addr::new(192, 168, 1, 20))
        );
        assert_eq!(
            resolve_local_bind_address(None, "http://127.0.0.1:5004/lineup.json"),
            Some(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn base_url_rejects_non_literals() {
        assert_eq!(resolve_local_bind_address(None, "http://tuner.local:5004"), None);
        assert_eq!(resolve_local_bind_address(None, "http://1.2.3:5004"), None);
        assert_eq!(resolve_local_bind_address(None, "http://1.2.3.4.5:5004"), None);
        assert_eq!(resolve_local_bind_address(None, "http://1234.2.3.4:5004"), None);
        assert_eq!(resolve_local_bind_address(None, "http://999.1.1.1:5004"), None);
        assert_eq!(resolve_local_bind_address(None, "192.168.1.20:5004"), None);
        assert_eq!(resolve_local_bind_address(None, ""), None);
    }

    #[test]
    fn base_url_host_ends_at_colon_only() {
        assert_eq!(resolve_local_bind_address(None, "http://127.0.0.1/lineup.json"), None);
    }

    #[test]
    fn rtp_url() {
        assert_eq!(
            parse_rtp_url("rtp://239.1.1.1:5004").unwrap(),
            SocketAddrV4::new(Ipv4Addr::new(239, 1, 1, 1), 5004)
        );
        assert_eq!(
            parse_rtp_url(" rtp://@239.1.1.1:5004/ ").unwrap(),
            SocketAddrV4::new(Ipv4Addr::new(239, 1, 1, 1), 5004)
        );
    }

    #[test]
    fn rtp_url_errors() {
        assert!(matches!(
            parse_rtp_url("rtp://239.1.1.1"),
            Err(TunerError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_rtp_url("rtp://239.1.1.1:70000"),
            Err(TunerError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_rtp_url("udp://239.1.1.1:5004"),
            Err(TunerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rtsp_authority() {
        assert_eq!(
            parse_rtsp_authority("rtsp://cam/stream").unwrap(),
            ("cam".to_string(), 554)
        );
        assert_eq!(
            parse_rtsp_authority("rtsp://user:pw@10.0.0.5:8554/live").unwrap(),
            ("10.0.0.5".to_string(), 8554)
        );
    }
}
