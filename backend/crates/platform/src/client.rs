//! Client identification utilities
//!
//! Resolves the client IP behind trusted reverse proxies and derives the
//! privacy-preserving key used for per-client bookkeeping.

use axum::http::HeaderMap;
use ipnetwork::IpNetwork;
use std::net::IpAddr;

use crate::crypto::hmac_sha256_hex;

/// Headers consulted (in order) when the direct peer is a trusted proxy
pub const FORWARDED_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

/// Key used when no client address is known at all
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Published Cloudflare IPv4 ranges
pub const CLOUDFLARE_IPV4_RANGES: [&str; 15] = [
    "173.245.48.0/20",
    "103.21.244.0/22",
    "103.22.200.0/22",
    "103.31.4.0/22",
    "141.101.64.0/18",
    "108.162.192.0/18",
    "190.93.240.0/20",
    "188.114.96.0/20",
    "197.234.240.0/22",
    "198.41.128.0/17",
    "162.158.0.0/15",
    "104.16.0.0/13",
    "104.24.0.0/14",
    "172.64.0.0/13",
    "131.0.72.0/22",
];

/// Whether `ip` lies inside `cidr`; malformed ranges match nothing
pub fn ip_in_range(ip: IpAddr, cidr: &str) -> bool {
    cidr.trim()
        .parse::<IpNetwork>()
        .is_ok_and(|network| network.contains(ip))
}

/// Proxy trust settings
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    /// Forwarding headers are ignored unless this is set
    pub enabled: bool,
    pub ranges: Vec<IpNetwork>,
}

impl TrustedProxies {
    pub fn new(enabled: bool, ranges: Vec<IpNetwork>) -> Self {
        Self { enabled, ranges }
    }

    /// Trust enabled with the Cloudflare ranges
    pub fn cloudflare() -> Self {
        let ranges = CLOUDFLARE_IPV4_RANGES
            .iter()
            .filter_map(|cidr| cidr.parse::<IpNetwork>().ok())
            .collect();
        Self::new(true, ranges)
    }

    pub fn is_trusted(&self, peer: IpAddr) -> bool {
        self.enabled && self.ranges.iter().any(|range| range.contains(peer))
    }
}

/// Resolve the client IP address
///
/// Forwarding headers are honoured only when the direct peer is a trusted
/// proxy; otherwise the peer address itself is the client. The spoofing
/// warning for an untrusted peer is logged only when it actually sent a
/// forwarding header.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    proxies: &TrustedProxies,
) -> Option<IpAddr> {
    let peer = peer?;

    if !proxies.is_trusted(peer) {
        if proxies.enabled && FORWARDED_IP_HEADERS.iter().any(|h| headers.contains_key(*h)) {
            tracing::warn!(%peer, "Forwarded IP header from untrusted peer ignored");
        }
        return Some(peer);
    }

    FORWARDED_IP_HEADERS
        .iter()
        .find_map(|name| forwarded_ip(headers, name))
        .or(Some(peer))
}

fn forwarded_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    // X-Forwarded-For: client, proxy1, proxy2
    value.split(',').next()?.trim().parse().ok()
}

/// Stable, non-reversible key for a client address
///
/// `hex(HMAC-SHA256(salt, ip))`; a missing address maps to the key of the
/// literal `"unknown"`.
pub fn client_key(ip: Option<IpAddr>, salt: &str) -> String {
    let ip = ip.map(|ip| ip.to_string());
    let subject = ip.as_deref().unwrap_or(UNKNOWN_CLIENT);
    hmac_sha256_hex(salt.as_bytes(), subject.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_ip_in_range_v4() {
        assert!(ip_in_range(ip("173.245.48.1"), "173.245.48.0/20"));
        assert!(ip_in_range(ip("173.245.63.255"), "173.245.48.0/20"));
        assert!(!ip_in_range(ip("173.245.64.0"), "173.245.48.0/20"));
        assert!(ip_in_range(ip("10.0.0.1"), "0.0.0.0/0"));
        assert!(ip_in_range(ip("10.0.0.1"), "10.0.0.1"));
    }

    #[test]
    fn test_ip_in_range_v6_and_mixed() {
        assert!(ip_in_range(ip("2400:cb00::1"), "2400:cb00::/32"));
        assert!(!ip_in_range(ip("2401:cb00::1"), "2400:cb00::/32"));
        assert!(!ip_in_range(ip("10.0.0.1"), "::/0"));
    }

    #[test]
    fn test_malformed_range_matches_nothing() {
        assert!(!ip_in_range(ip("10.0.0.1"), "10.0.0.0/33"));
        assert!(!ip_in_range(ip("10.0.0.1"), "not-an-ip/8"));
        assert!(!ip_in_range(ip("10.0.0.1"), "10.0.0.0/x"));
    }

    #[test]
    fn test_cloudflare_ranges_all_parse() {
        let proxies = TrustedProxies::cloudflare();
        assert_eq!(proxies.ranges.len(), CLOUDFLARE_IPV4_RANGES.len());
        assert!(proxies.is_trusted(ip("162.159.1.1")));
        assert!(!proxies.is_trusted(ip("8.8.8.8")));
    }

    #[test]
    fn test_resolve_untrusted_peer_ignores_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));

        let resolved = resolve_client_ip(&headers, Some(ip("9.9.9.9")), &TrustedProxies::cloudflare());
        assert_eq!(resolved, Some(ip("9.9.9.9")));
    }

    #[test]
    fn test_resolve_untrusted_peer_without_forwarding_headers() {
        let proxies = TrustedProxies::cloudflare();
        let resolved = resolve_client_ip(&HeaderMap::new(), Some(ip("9.9.9.9")), &proxies);
        assert_eq!(resolved, Some(ip("9.9.9.9")));
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None, &proxies), None);
    }

    #[test]
    fn test_resolve_trusted_peer_header_order() {
        let proxies = TrustedProxies::cloudflare();
        let peer = Some(ip("104.16.0.10"));

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("5.5.5.5"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("4.4.4.4, 104.16.0.10"));
        assert_eq!(resolve_client_ip(&headers, peer, &proxies), Some(ip("4.4.4.4")));

        headers.insert("cf-connecting-ip", HeaderValue::from_static("3.3.3.3"));
        assert_eq!(resolve_client_ip(&headers, peer, &proxies), Some(ip("3.3.3.3")));
    }

    #[test]
    fn test_resolve_trust_disabled() {
        let proxies = TrustedProxies::new(false, TrustedProxies::cloudflare().ranges);
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("3.3.3.3"));

        let resolved = resolve_client_ip(&headers, Some(ip("104.16.0.10")), &proxies);
        assert_eq!(resolved, Some(ip("104.16.0.10")));
    }

    #[test]
    fn test_resolve_garbage_header_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("not-an-ip"));

        let resolved = resolve_client_ip(&headers, Some(ip("104.16.0.10")), &TrustedProxies::cloudflare());
        assert_eq!(resolved, Some(ip("104.16.0.10")));
    }

    #[test]
    fn test_client_key_stable_and_salted() {
        let a = client_key(Some(ip("1.2.3.4")), "salt");
        assert_eq!(a, client_key(Some(ip("1.2.3.4")), "salt"));
        assert_ne!(a, client_key(Some(ip("1.2.3.5")), "salt"));
        assert_ne!(a, client_key(Some(ip("1.2.3.4")), "other"));
        assert_eq!(a.len(), 64);
        assert!(!a.contains("1.2.3.4"));
    }

    #[test]
    fn test_client_key_unknown() {
        assert_eq!(client_key(None, "s"), hmac_sha256_hex(b"s", b"unknown"));
    }
}
