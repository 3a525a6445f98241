//! Client key derivation.
//!
//! Header values are trusted as-is; a client that can set `X-Forwarded-For`
//! can pick its own key. Deploy behind a proxy that overwrites these headers.

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const KEY_PREFIX: &str = "rate_limit:";
pub const UNKNOWN_CLIENT: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Identity of the caller: first non-empty of `X-Forwarded-For` (first hop),
/// `X-Real-IP`, the transport peer address, else `"unknown"`.
pub fn client_identity(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    let real_ip = header_str(headers, REAL_IP)
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Counter key for the caller.
pub fn client_key(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    format!("{}{}", KEY_PREFIX, client_identity(headers, remote))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_wins() {
        let map = headers(&[("x-forwarded-for", "1.2.3.4, 10.0.0.1"), ("x-real-ip", "5.6.7.8")]);
        let remote = Some("9.9.9.9:443".parse().unwrap());
        assert_eq!(client_key(&map, remote), "rate_limit:1.2.3.4");
    }

    #[test]
    fn test_real_ip_when_forwarded_empty() {
        let map = headers(&[("x-forwarded-for", "  "), ("x-real-ip", "5.6.7.8")]);
        assert_eq!(client_identity(&map, None), "5.6.7.8");
    }

    #[test]
    fn test_remote_address_fallback() {
        let remote = Some("[::1]:8080".parse().unwrap());
        assert_eq!(client_identity(&HeaderMap::new(), remote), "::1");
    }

    #[test]
    fn test_unknown_client() {
        assert_eq!(client_key(&HeaderMap::new(), None), "rate_limit:unknown");
    }
}
