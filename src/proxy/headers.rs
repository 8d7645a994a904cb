//! Outbound header construction and response header filtering.
//!
//! [`build_outbound_headers`] turns the inbound header list into the list
//! sent upstream: connection-scoped and regenerated headers are dropped,
//! everything else keeps its order and multiplicity, and the provenance
//! headers `X-Forwarded-For` and `Forwarded` are appended last.
//! [`relayable_response_headers`] removes the encoding headers that no
//! longer describe the decoded body relayed to the client.

use std::net::IpAddr;

use axum::http::header::{CONTENT_ENCODING, FORWARDED, TRANSFER_ENCODING, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Ordered `(name, value)` pairs. Duplicate names are allowed.
pub type HeaderList = Vec<(HeaderName, HeaderValue)>;

/// Names that are never copied verbatim from the inbound request.
pub const DROPPED_REQUEST_HEADERS: &[&str] = &[
    "user-agent",
    "forwarded",
    "x-forwarded-for",
    "content-length",
    "connection",
    "host",
];

/// Per-deployment knobs for the header transform.
#[derive(Debug, Clone)]
pub struct HeaderRules {
    pub target_header: HeaderName,
    pub forward_user_agent: bool,
}

impl HeaderRules {
    fn drops(&self, name: &HeaderName) -> bool {
        // Pseudo-headers never reach a HeaderMap, but raw lists may carry them.
        if name.as_str().starts_with(':') || *name == self.target_header {
            return true;
        }
        if *name == USER_AGENT {
            return !self.forward_user_agent;
        }
        DROPPED_REQUEST_HEADERS.contains(&name.as_str())
    }
}

/// Format a client address for `X-Forwarded-For` / `Forwarded`.
/// IPv6 is bracketed; IPv4-mapped IPv6 is unwrapped first.
#[must_use]
pub fn format_client_addr(addr: IpAddr) -> String {
    match addr.to_canonical() {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    }
}

/// Join every textual value of `name` with `", "`, the way repeated
/// list-valued headers combine.
fn joined_values<'a, I>(headers: I, name: &HeaderName) -> Option<String>
where
    I: IntoIterator<Item = (&'a HeaderName, &'a HeaderValue)>,
{
    let values: Vec<&str> = headers
        .into_iter()
        .filter(|(n, _)| *n == name)
        .filter_map(|(_, v)| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

pub fn build_outbound_headers<'a, I>(
    inbound: I,
    client_addr: IpAddr,
    rules: &HeaderRules,
) -> HeaderList
where
    I: IntoIterator<Item = (&'a HeaderName, &'a HeaderValue)> + Clone,
{
    let mut headers: HeaderList = inbound
        .clone()
        .into_iter()
        .filter(|(name, _)| !rules.drops(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let client = format_client_addr(client_addr);

    let xff = joined_values(inbound.clone(), &X_FORWARDED_FOR)
        .map_or_else(|| client.clone(), |existing| format!("{existing}, {client}"));
    let forwarded = joined_values(inbound, &FORWARDED).map_or_else(
        || format!("for={client}"),
        |existing| format!("{existing}, for={client}"),
    );

    for (name, value) in [(X_FORWARDED_FOR, xff), (FORWARDED, forwarded)] {
        match HeaderValue::from_str(&value) {
            Ok(val) => headers.push((name, val)),
            Err(e) => {
                tracing::warn!(header = %name, error = %e, "unencodable provenance header, skipping");
            }
        }
    }

    headers
}

/// Strip `transfer-encoding` and `content-encoding` from an upstream
/// response. The body has already been collected and decoded, so both
/// would misdescribe what the client receives.
pub fn relayable_response_headers(mut headers: HeaderMap) -> HeaderMap {
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONTENT_ENCODING);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn rules() -> HeaderRules {
        HeaderRules {
            target_header: HeaderName::from_static("x-proxy-url"),
            forward_user_agent: false,
        }
    }

    fn client() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8))
    }

    fn values<'a>(list: &'a HeaderList, name: &str) -> Vec<&'a str> {
        list.iter()
            .filter(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.to_str().unwrap())
            .collect()
    }

    #[test]
    fn drops_filtered_headers() {
        let mut original = HeaderMap::new();
        original.insert("user-agent", "curl/8".parse().unwrap());
        original.insert("content-length", "12".parse().unwrap());
        original.insert("x-proxy-url", "http://upstream".parse().unwrap());
        original.insert("connection", "keep-alive".parse().unwrap());
        original.insert("host", "proxy.local".parse().unwrap());
        original.insert("content-type", "application/json".parse().unwrap());

        let result = build_outbound_headers(&original, client(), &rules());

        for name in ["user-agent", "content-length", "x-proxy-url", "connection", "host"] {
            assert!(values(&result, name).is_empty(), "{name} was forwarded");
        }
        assert_eq!(values(&result, "content-type"), vec!["application/json"]);
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let mut original = HeaderMap::new();
        original.append("accept", "text/html".parse().unwrap());
        original.append("accept", "application/json".parse().unwrap());
        original.append("x-trace", "1".parse().unwrap());

        let result = build_outbound_headers(&original, client(), &rules());
        let names: Vec<&str> = result.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(
            names,
            vec!["accept", "accept", "x-trace", "x-forwarded-for", "forwarded"]
        );
        assert_eq!(values(&result, "accept"), vec!["text/html", "application/json"]);
    }

    #[test]
    fn ordered_pairs_keep_interleaving() {
        let inbound: HeaderList = vec![
            (HeaderName::from_static("x-a"), HeaderValue::from_static("1")),
            (HeaderName::from_static("x-b"), HeaderValue::from_static("2")),
            (HeaderName::from_static("x-a"), HeaderValue::from_static("3")),
        ];

        let pairs = inbound.iter().map(|(n, v)| (n, v));
        let result = build_outbound_headers(pairs, client(), &rules());
        let pairs: Vec<(&str, &str)> = result
            .iter()
            .take(3)
            .map(|(n, v)| (n.as_str(), v.to_str().unwrap()))
            .collect();

        assert_eq!(pairs, vec![("x-a", "1"), ("x-b", "2"), ("x-a", "3")]);
    }

    #[test]
    fn header_map_input_is_grouped_by_name() {
        let mut original = HeaderMap::new();
        original.append("x-a", "1".parse().unwrap());
        original.append("x-b", "2".parse().unwrap());
        original.append("x-a", "3".parse().unwrap());

        let result = build_outbound_headers(&original, client(), &rules());
        let pairs: Vec<(&str, &str)> = result
            .iter()
            .take(3)
            .map(|(n, v)| (n.as_str(), v.to_str().unwrap()))
            .collect();

        assert_eq!(pairs, vec![("x-a", "1"), ("x-a", "3"), ("x-b", "2")]);
    }

    #[test]
    fn appends_x_forwarded_for() {
        let mut original = HeaderMap::new();
        original.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());

        let result = build_outbound_headers(&original, client(), &rules());

        assert_eq!(values(&result, "x-forwarded-for"), vec!["1.2.3.4, 5.6.7.8"]);
    }

    #[test]
    fn sets_x_forwarded_for_without_chain() {
        let result = build_outbound_headers(&HeaderMap::new(), client(), &rules());
        assert_eq!(values(&result, "x-forwarded-for"), vec!["5.6.7.8"]);
        assert_eq!(values(&result, "forwarded"), vec!["for=5.6.7.8"]);
    }

    #[test]
    fn appends_forwarded() {
        let mut original = HeaderMap::new();
        original.insert("forwarded", "for=1.2.3.4".parse().unwrap());

        let result = build_outbound_headers(&original, client(), &rules());

        assert_eq!(values(&result, "forwarded"), vec!["for=1.2.3.4, for=5.6.7.8"]);
    }

    #[test]
    fn repeated_chain_headers_are_joined() {
        let mut original = HeaderMap::new();
        original.append("x-forwarded-for", "1.1.1.1".parse().unwrap());
        original.append("x-forwarded-for", "2.2.2.2".parse().unwrap());

        let result = build_outbound_headers(&original, client(), &rules());

        assert_eq!(
            values(&result, "x-forwarded-for"),
            vec!["1.1.1.1, 2.2.2.2, 5.6.7.8"]
        );
    }

    #[test]
    fn brackets_ipv6_clients() {
        let result =
            build_outbound_headers(&HeaderMap::new(), IpAddr::V6(Ipv6Addr::LOCALHOST), &rules());
        assert_eq!(values(&result, "x-forwarded-for"), vec!["[::1]"]);
        assert_eq!(values(&result, "forwarded"), vec!["for=[::1]"]);
    }

    #[test]
    fn unwraps_ipv4_mapped_clients() {
        let mapped = IpAddr::V6(Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped());
        assert_eq!(format_client_addr(mapped), "10.0.0.1");
    }

    #[test]
    fn user_agent_forwarding_is_configurable() {
        let mut original = HeaderMap::new();
        original.insert("user-agent", "curl/8".parse().unwrap());
        let rules = HeaderRules {
            forward_user_agent: true,
            ..rules()
        };

        let result = build_outbound_headers(&original, client(), &rules);

        assert_eq!(values(&result, "user-agent"), vec!["curl/8"]);
    }

    #[test]
    fn target_header_name_is_configurable() {
        let mut original = HeaderMap::new();
        original.insert("proxy-url", "http://upstream".parse().unwrap());
        original.insert("x-proxy-url", "kept".parse().unwrap());
        let rules = HeaderRules {
            target_header: HeaderName::from_static("proxy-url"),
            ..rules()
        };

        let result = build_outbound_headers(&original, client(), &rules);

        assert!(values(&result, "proxy-url").is_empty());
        assert_eq!(values(&result, "x-proxy-url"), vec!["kept"]);
    }

    #[test]
    fn strips_encoding_headers_from_response() {
        let mut upstream = HeaderMap::new();
        upstream.insert("transfer-encoding", "chunked".parse().unwrap());
        upstream.insert("content-encoding", "gzip".parse().unwrap());
        upstream.append("set-cookie", "a=1".parse().unwrap());
        upstream.append("set-cookie", "b=2".parse().unwrap());

        let relayed = relayable_response_headers(upstream);

        assert!(relayed.get("transfer-encoding").is_none());
        assert!(relayed.get("content-encoding").is_none());
        let cookies: Vec<_> = relayed.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }
}
