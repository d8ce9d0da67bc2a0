use axum::http::HeaderMap;
use std::net::IpAddr;

/// The address a request is rate limited under.
///
/// Forwarding headers are client-controlled, so they are read only when
/// `trust_proxy_headers` is set. Otherwise the socket peer decides.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }
    peer.unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|hv| hv.to_str().ok());
    header("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .or_else(|| header("x-real-ip").and_then(|v| v.trim().parse().ok()))
}
