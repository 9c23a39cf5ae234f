use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use crate::config::CanonicalOrigin;
use crate::handlers::public_handlers::found;
use crate::AppState;

/// Splits a Host header into host and port. IPv6 literals come back without brackets.
/// `None` when the header cannot be a host at all.
pub fn split_host_port(value: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = match tail {
            "" => None,
            _ => Some(tail.strip_prefix(':')?.parse().ok()?),
        };
        return Some((host, port));
    }
    match value.rsplit_once(':') {
        // Two or more colons without brackets is a bare IPv6 address.
        Some((host, port)) if !host.contains(':') => Some((host, Some(port.parse().ok()?))),
        _ => Some((value, None)),
    }
}

/// Where to send a request that arrived on a non-canonical host, if anywhere.
pub fn canonical_redirect(canonical: &CanonicalOrigin, host_header: Option<&str>, path_and_query: &str) -> Option<String> {
    let host = host_header?.trim();
    if host.is_empty() {
        return None;
    }
    let on_canonical = match split_host_port(host) {
        Some((name, port)) => {
            name.eq_ignore_ascii_case(&canonical.host)
                && port.or(canonical.default_port) == canonical.port.or(canonical.default_port)
        }
        None => false,
    };
    if on_canonical {
        return None;
    }
    Some(format!("{}{}", canonical.origin, path_and_query))
}

pub async fn enforce_canonical_host(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(canonical) = &state.config.canonical {
        let host = request.headers().get(header::HOST).and_then(|value| value.to_str().ok());
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        if let Some(location) = canonical_redirect(canonical, host, path_and_query) {
            debug!("Redirecting {:?} to canonical {}", host, location);
            return found(&location);
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn canonical_for(base: &str) -> CanonicalOrigin {
        CanonicalOrigin::from_url(&Url::parse(base).unwrap()).unwrap()
    }

    fn canonical() -> CanonicalOrigin {
        canonical_for("https://school.example.com")
    }

    #[test]
    fn foreign_host_is_sent_to_canonical_origin_with_path() {
        assert_eq!(
            canonical_redirect(&canonical(), Some("www.school.example.com"), "/courses/business?utm_source=vk").as_deref(),
            Some("https://school.example.com/courses/business?utm_source=vk")
        );
    }

    #[test]
    fn canonical_or_missing_host_passes_through() {
        assert_eq!(canonical_redirect(&canonical(), Some("School.Example.com"), "/"), None);
        assert_eq!(canonical_redirect(&canonical(), Some("school.example.com:443"), "/"), None);
        assert_eq!(canonical_redirect(&canonical(), None, "/"), None);
    }

    #[test]
    fn port_is_part_of_the_canonical_host() {
        assert_eq!(
            canonical_redirect(&canonical(), Some("school.example.com:8443"), "/").as_deref(),
            Some("https://school.example.com/")
        );

        let local = canonical_for("http://localhost:3000");
        assert_eq!(canonical_redirect(&local, Some("localhost:3000"), "/"), None);
        assert_eq!(
            canonical_redirect(&local, Some("localhost"), "/apply").as_deref(),
            Some("http://localhost:3000/apply")
        );
        assert!(canonical_redirect(&local, Some("localhost:80"), "/").is_some());
    }

    #[test]
    fn ipv6_hosts_are_compared_whole() {
        let v6 = canonical_for("http://[::1]:3000");
        assert_eq!(canonical_redirect(&v6, Some("[::1]:3000"), "/"), None);
        assert_eq!(
            canonical_redirect(&v6, Some("[::2]:3000"), "/").as_deref(),
            Some("http://[::1]:3000/")
        );
        assert!(canonical_redirect(&v6, Some("[::1]"), "/").is_some());
        assert!(canonical_redirect(&v6, Some("[::1"), "/").is_some());
    }

    #[test]
    fn host_header_splitting() {
        assert_eq!(split_host_port("example.com"), Some(("example.com", None)));
        assert_eq!(split_host_port("example.com:8080"), Some(("example.com", Some(8080))));
        assert_eq!(split_host_port("[fe80::1]:443"), Some(("fe80::1", Some(443))));
        assert_eq!(split_host_port("[fe80::1]"), Some(("fe80::1", None)));
        assert_eq!(split_host_port("fe80::1"), Some(("fe80::1", None)));
        assert_eq!(split_host_port("example.com:http"), None);
        assert_eq!(split_host_port("[fe80::1]x"), None);
    }
}
