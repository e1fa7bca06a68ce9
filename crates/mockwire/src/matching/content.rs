//! Body-based selection among mocks sharing a URL and method.

use super::error::{BodyOrigin, MatchError};
use super::{json, xml};
use crate::mock::{MockNode, ServiceType};
use std::sync::Arc;
use tracing::debug;

/// Structured body comparison for one service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMatcher {
    /// REST bodies compared by JSON field paths
    Json,
    /// SOAP envelopes compared by element paths
    Xml,
}

impl ContentMatcher {
    pub fn for_service(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Rest => ContentMatcher::Json,
            ServiceType::Soap => ContentMatcher::Xml,
        }
    }

    /// Pick the candidate whose body agrees with `request_body` on every field
    /// path, falling back to the first candidate when none does.
    ///
    /// Bodies are only parsed when there is an actual choice to make: with a
    /// single candidate or no field paths the first candidate is returned as is.
    pub fn select(
        self,
        request_body: &str,
        candidates: &[Arc<MockNode>],
        field_paths: Option<&[String]>,
    ) -> Result<Option<Arc<MockNode>>, MatchError> {
        let Some(first) = candidates.first() else {
            return Ok(None);
        };
        let paths = match field_paths {
            Some(paths) if !paths.is_empty() && candidates.len() > 1 => paths,
            _ => return Ok(Some(Arc::clone(first))),
        };

        let matched = match self {
            ContentMatcher::Json => select_json(request_body, candidates, paths)?,
            ContentMatcher::Xml => select_xml(request_body, candidates, paths)?,
        };
        match matched {
            Some(mock) => Ok(Some(mock)),
            None => {
                debug!(
                    "No candidate matched all {} field paths, using first of {}",
                    paths.len(),
                    candidates.len()
                );
                Ok(Some(Arc::clone(first)))
            }
        }
    }
}

fn select_json(
    request_body: &str,
    candidates: &[Arc<MockNode>],
    paths: &[String],
) -> Result<Option<Arc<MockNode>>, MatchError> {
    let fields = paths
        .iter()
        .map(|p| json::JsonField::compile(p))
        .collect::<Result<Vec<_>, _>>()?;
    let incoming = json::parse_body(request_body, BodyOrigin::Incoming)?;

    for candidate in candidates {
        let Some(body) = candidate.request_body() else {
            continue;
        };
        let recorded = json::parse_body(body, BodyOrigin::Recorded)?;
        if json::fields_equal(&incoming, &recorded, &fields)? {
            return Ok(Some(Arc::clone(candidate)));
        }
    }
    Ok(None)
}

fn select_xml(
    request_body: &str,
    candidates: &[Arc<MockNode>],
    paths: &[String],
) -> Result<Option<Arc<MockNode>>, MatchError> {
    let paths = paths
        .iter()
        .map(|p| xml::compile_path(p))
        .collect::<Result<Vec<_>, _>>()?;
    let incoming_package = xml::parse_body(request_body, BodyOrigin::Incoming)?;
    let Some(incoming) = xml::root_element(&incoming_package) else {
        return Ok(None);
    };

    for candidate in candidates {
        let Some(body) = candidate.request_body() else {
            continue;
        };
        let recorded_package = xml::parse_body(body, BodyOrigin::Recorded)?;
        let Some(recorded) = xml::root_element(&recorded_package) else {
            continue;
        };
        if xml::fields_equal(incoming, recorded, &paths) {
            return Ok(Some(Arc::clone(candidate)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest(description: &str, body: &str) -> Arc<MockNode> {
        Arc::new(
            MockNode::rest("/api/customers", "POST")
                .with_description(description)
                .with_request_body(body),
        )
    }

    fn paths(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_no_candidates() {
        let result = ContentMatcher::Json.select("{}", &[], Some(paths(&["id"]).as_slice()));
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_single_candidate_skips_parsing() {
        let candidates = vec![rest("only", "not json at all")];
        let result = ContentMatcher::Json
            .select("also not json", &candidates, Some(paths(&["id"]).as_slice()))
            .unwrap()
            .unwrap();
        assert_eq!(result.label(), "only");
    }

    #[test]
    fn test_no_field_paths_returns_first() {
        let candidates = vec![rest("first", "{bad"), rest("second", "{bad")];
        let result = ContentMatcher::Json.select("{bad", &candidates, None).unwrap();
        assert_eq!(result.unwrap().label(), "first");
        let empty: Vec<String> = Vec::new();
        let result = ContentMatcher::Json
            .select("{bad", &candidates, Some(empty.as_slice()))
            .unwrap();
        assert_eq!(result.unwrap().label(), "first");
    }

    #[test]
    fn test_field_match_selects_candidate() {
        let candidates = vec![
            rest("other", r#"{"id": "2000002"}"#),
            rest("wanted", r#"{"id": "1000001", "name": "x"}"#),
        ];
        let fields = paths(&["id"]);
        let result = ContentMatcher::Json
            .select(r#"{"id":"1000001"}"#, &candidates, Some(fields.as_slice()))
            .unwrap();
        assert_eq!(result.unwrap().label(), "wanted");

        let result = ContentMatcher::Json
            .select(r#"{"id":"3000003"}"#, &candidates, Some(fields.as_slice()))
            .unwrap();
        assert_eq!(result.unwrap().label(), "other");
    }

    #[test]
    fn test_first_full_match_wins() {
        let candidates = vec![
            rest("a", r#"{"id": 1, "kind": "x"}"#),
            rest("b", r#"{"id": 1, "kind": "y"}"#),
            rest("c", r#"{"id": 1, "kind": "y"}"#),
        ];
        let result = ContentMatcher::Json
            .select(
                r#"{"id": 1, "kind": "y"}"#,
                &candidates,
                Some(paths(&["id", "kind"]).as_slice()),
            )
            .unwrap();
        assert_eq!(result.unwrap().label(), "b");
    }

    #[test]
    fn test_candidate_without_body_is_skipped() {
        let candidates = vec![
            Arc::new(MockNode::rest("/api/customers", "POST").with_description("empty")),
            rest("wanted", r#"{"id": 7}"#),
        ];
        let result = ContentMatcher::Json
            .select(r#"{"id": 7}"#, &candidates, Some(paths(&["id"]).as_slice()))
            .unwrap();
        assert_eq!(result.unwrap().label(), "wanted");
    }

    #[test]
    fn test_malformed_bodies_are_errors() {
        let candidates = vec![rest("a", r#"{"id": 1}"#), rest("b", "{broken")];
        let fields = paths(&["id"]);
        let err = ContentMatcher::Json
            .select("{broken", &candidates, Some(fields.as_slice()))
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::Parse {
                origin: BodyOrigin::Incoming,
                ..
            }
        ));

        let err = ContentMatcher::Json
            .select(r#"{"id": 2}"#, &candidates, Some(fields.as_slice()))
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::Parse {
                origin: BodyOrigin::Recorded,
                ..
            }
        ));
    }

    #[test]
    fn test_xml_selection() {
        let envelope = |id: &str| {
            format!(
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><GetAccountRequest><AccountId>{id}</AccountId></GetAccountRequest></s:Body></s:Envelope>"#
            )
        };
        let soap = |description: &str, id: &str| {
            Arc::new(
                MockNode::soap("/ws/accounts", "GetAccount")
                    .with_description(description)
                    .with_request_body(envelope(id)),
            )
        };
        let candidates = vec![soap("first", "1"), soap("second", "2")];
        let fields = paths(&["GetAccountRequest/AccountId"]);
        let result = ContentMatcher::Xml
            .select(&envelope("2"), &candidates, Some(fields.as_slice()))
            .unwrap();
        assert_eq!(result.unwrap().label(), "second");

        let result = ContentMatcher::Xml
            .select(&envelope("9"), &candidates, Some(fields.as_slice()))
            .unwrap();
        assert_eq!(result.unwrap().label(), "first");
    }

    #[test]
    fn test_for_service() {
        assert_eq!(ContentMatcher::for_service(ServiceType::Rest), ContentMatcher::Json);
        assert_eq!(ContentMatcher::for_service(ServiceType::Soap), ContentMatcher::Xml);
    }
}
