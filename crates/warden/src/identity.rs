//! Request identity: best-effort client address and header-shape fingerprint.

use axum::http::{HeaderMap, Method};
use sha2::{Digest, Sha256};
use std::net::{Ipv4Addr, SocketAddr};

use stillwater_common::constants::{UNKNOWN_CLIENT, headers::X_FORWARDED_FOR};

/// Headers whose values feed the fingerprint, in order
const FINGERPRINT_HEADERS: [&str; 5] = [
    "user-agent",
    "accept",
    "accept-language",
    "accept-encoding",
    "connection",
];

/// Hex characters kept from the fingerprint digest
const FINGERPRINT_LEN: usize = 16;

/// Resolve the originating client address.
///
/// Walks `X-Forwarded-For` left to right and returns the first dotted quad
/// outside private, loopback, link-local and multicast/reserved space. Falls
/// back to the socket peer, then to `"unknown"`. Malformed entries are skipped.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
    {
        let public = forwarded
            .split(',')
            .map(str::trim)
            .filter_map(|entry| entry.parse::<Ipv4Addr>().ok())
            .find(is_public_v4);

        if let Some(ip) = public {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// True for addresses outside 10/8, 172.16/12, 192.168/16, 127/8, 169.254/16 and >= 224/4
fn is_public_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    !(a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || a == 127
        || (a == 169 && b == 254)
        || a >= 224)
}

/// Deterministic fingerprint of the request's header shape.
///
/// Two requests with the same header values, header names, method and path
/// collide on purpose; the value is a rate-limit key, not a personal identifier.
pub fn fingerprint(headers: &HeaderMap, method: &Method, path: &str) -> String {
    fingerprint_raw(headers, method.as_str(), path)
}

/// Same as [`fingerprint`] with the method given as text
pub fn fingerprint_raw(headers: &HeaderMap, method: &str, path: &str) -> String {
    let mut parts: Vec<String> = FINGERPRINT_HEADERS
        .iter()
        .map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        })
        .collect();

    let mut names: Vec<&str> = headers.keys().map(|k| k.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    parts.push(names.join(","));
    parts.push(method.to_string());
    parts.push(path.to_string());

    let digest = Sha256::digest(parts.join("|").as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_xff(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_skips_private_ranges() {
        let headers = with_xff("10.0.0.1, 172.20.1.1, 192.168.1.1, 127.0.0.1, 169.254.3.3, 203.0.113.7");
        assert_eq!(client_ip(&headers, None), "203.0.113.7");
    }

    #[test]
    fn test_skips_multicast_and_malformed() {
        let headers = with_xff("224.0.0.1, not-an-ip, 999.1.1.1, , 8.8.8.8, 1.1.1.1");
        assert_eq!(client_ip(&headers, None), "8.8.8.8");
    }

    #[test]
    fn test_172_outside_private_block_is_public() {
        let headers = with_xff("172.32.0.1");
        assert_eq!(client_ip(&headers, None), "172.32.0.1");
    }

    #[test]
    fn test_falls_back_to_peer_then_unknown() {
        let headers = with_xff("10.1.2.3");
        let peer: SocketAddr = "198.51.100.4:5555".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.4");
        assert_eq!(client_ip(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        let a = fingerprint(&headers, &Method::POST, "/api/chat");
        let b = fingerprint(&headers, &Method::POST, "/api/chat");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(a, fingerprint(&headers, &Method::POST, "/api/share"));
        assert_ne!(a, fingerprint(&headers, &Method::GET, "/api/chat"));
    }

    #[test]
    fn test_fingerprint_sees_header_names() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));
        let before = fingerprint(&headers, &Method::POST, "/api/chat");

        headers.insert("x-extra", HeaderValue::from_static("1"));
        assert_ne!(before, fingerprint(&headers, &Method::POST, "/api/chat"));
    }
}
