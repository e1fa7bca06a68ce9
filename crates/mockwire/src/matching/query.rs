//! Query string containment matching.
//!
//! A mock's query parameters must all be present in the incoming request with
//! equal values (or the `(*)` wildcard); extra incoming parameters are ignored.
//! A request url without any query string is not checked against the pattern;
//! the repository skips the query filter for it.

use super::path::WILDCARD;
use std::collections::HashMap;

/// The query string of a URL, without the leading `?`. Empty when absent.
pub fn query_of(url: &str) -> &str {
    url.split_once('?').map(|(_, query)| query).unwrap_or("")
}

/// Parse a query string into a map with lower-cased keys.
///
/// Values are percent-decoded. A pair without `=` maps to an empty value and
/// later duplicates replace earlier ones.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }
        params.insert(decode(key).to_lowercase(), decode(value));
    }
    params
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Compiled query constraint of a mock URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPattern {
    params: HashMap<String, String>,
}

impl QueryPattern {
    pub fn from_url(url: &str) -> Self {
        Self {
            params: parse_query(query_of(url)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Check whether every constrained parameter is satisfied by `incoming`.
    pub fn matches(&self, incoming: &HashMap<String, String>) -> bool {
        self.params.iter().all(|(key, expected)| {
            incoming.get(key).is_some_and(|actual| {
                expected == WILDCARD || actual.to_lowercase() == expected.to_lowercase()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(url: &str) -> HashMap<String, String> {
        parse_query(query_of(url))
    }

    #[test]
    fn test_parse_query() {
        let params = parse_query("A=1&b=hello%20world&&flag&c=");
        assert_eq!(params.get("a").map(String::as_str), Some("1"));
        assert_eq!(params.get("b").map(String::as_str), Some("hello world"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        assert_eq!(params.get("c").map(String::as_str), Some(""));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let params = parse_query("a=1&A=2");
        assert_eq!(params.get("a").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_subset_match_is_order_insensitive() {
        let pattern = QueryPattern::from_url("/x?a=1&b=2");
        assert!(pattern.matches(&incoming("/x?b=2&a=1&c=3")));
        assert!(!pattern.matches(&incoming("/x?a=1")));
        assert!(!pattern.matches(&incoming("/x?a=1&b=3")));
    }

    #[test]
    fn test_values_compare_case_insensitively() {
        let pattern = QueryPattern::from_url("/x?Name=Alice");
        assert!(pattern.matches(&incoming("/x?name=ALICE")));
    }

    #[test]
    fn test_wildcard_value() {
        let pattern = QueryPattern::from_url("/x?a=(*)&b=2");
        assert!(pattern.matches(&incoming("/x?a=222&b=2")));
        assert!(pattern.matches(&incoming("/x?a=333&b=2")));
        // the key itself is still required
        assert!(!pattern.matches(&incoming("/x?b=2")));
    }

    #[test]
    fn test_empty_pattern_matches_anything() {
        let pattern = QueryPattern::from_url("/x");
        assert!(pattern.is_empty());
        assert!(pattern.matches(&incoming("/x")));
        assert!(pattern.matches(&incoming("/x?z=9")));
    }
}
