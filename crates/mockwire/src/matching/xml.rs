//! XML body comparison by element path, and SOAP action extraction.
//!
//! Element paths are slash-separated local names (`Customer/Id`). The first
//! segment is searched among all descendants of the root element; each later
//! segment selects the first child with that name. Names compare
//! case-insensitively and ignore namespaces.

use super::error::{BodyKind, BodyOrigin, MatchError};
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::{parser, Package};

const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

pub fn parse_body(body: &str, origin: BodyOrigin) -> Result<Package, MatchError> {
    parser::parse(body).map_err(|e| MatchError::parse(BodyKind::Xml, origin, format!("{e:?}")))
}

/// The document element of a parsed package.
pub fn root_element(package: &Package) -> Option<Element<'_>> {
    package
        .as_document()
        .root()
        .children()
        .into_iter()
        .find_map(|child| match child {
            ChildOfRoot::Element(element) => Some(element),
            _ => None,
        })
}

/// Split an element path into its non-empty segments.
pub fn compile_path(raw: &str) -> Result<Vec<String>, MatchError> {
    let segments: Vec<String> = raw
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    if segments.is_empty() {
        return Err(MatchError::field_path(raw, "empty path"));
    }
    Ok(segments)
}

fn name_is(element: Element<'_>, name: &str) -> bool {
    element.name().local_part().eq_ignore_ascii_case(name)
}

fn child_elements<'d>(element: Element<'d>) -> impl Iterator<Item = Element<'d>> {
    element.children().into_iter().filter_map(|child| match child {
        ChildOfElement::Element(e) => Some(e),
        _ => None,
    })
}

/// Descendants of `element` in document order, excluding `element` itself.
fn descendants(element: Element<'_>) -> Vec<Element<'_>> {
    let mut found = Vec::new();
    let mut stack: Vec<Element<'_>> = child_elements(element).collect();
    stack.reverse();
    while let Some(next) = stack.pop() {
        found.push(next);
        let mut children: Vec<Element<'_>> = child_elements(next).collect();
        children.reverse();
        stack.extend(children);
    }
    found
}

/// First element reached by following `segments` from a descendant of `root`.
pub fn find_node<'d>(root: Element<'d>, segments: &[String]) -> Option<Element<'d>> {
    let (first, rest) = segments.split_first()?;
    descendants(root)
        .into_iter()
        .filter(|e| name_is(*e, first))
        .find_map(|start| {
            rest.iter().try_fold(start, |current, name| {
                child_elements(current).find(|child| name_is(*child, name))
            })
        })
}

enum Content<'d> {
    Element(Element<'d>),
    Text(String),
}

/// Child elements plus non-whitespace text, with adjacent text runs merged.
fn significant_children(element: Element<'_>) -> Vec<Content<'_>> {
    let mut content: Vec<Content<'_>> = Vec::new();
    for child in element.children() {
        match child {
            ChildOfElement::Element(e) => content.push(Content::Element(e)),
            ChildOfElement::Text(text) => {
                if let Some(Content::Text(previous)) = content.last_mut() {
                    previous.push_str(text.text());
                } else {
                    content.push(Content::Text(text.text().to_string()));
                }
            }
            _ => {}
        }
    }
    content.retain(|c| !matches!(c, Content::Text(t) if t.trim().is_empty()));
    content
}

fn attributes(element: Element<'_>) -> Vec<(Option<String>, String, String)> {
    let mut attrs: Vec<_> = element
        .attributes()
        .into_iter()
        .filter(|a| a.name().namespace_uri() != Some(XMLNS_NS))
        .map(|a| {
            (
                a.name().namespace_uri().map(str::to_string),
                a.name().local_part().to_string(),
                a.value().to_string(),
            )
        })
        .collect();
    attrs.sort();
    attrs
}

/// Structural equality of two elements: names, attributes and content.
pub fn deep_equals(a: Element<'_>, b: Element<'_>) -> bool {
    if a.name().namespace_uri() != b.name().namespace_uri()
        || a.name().local_part() != b.name().local_part()
    {
        return false;
    }
    if attributes(a) != attributes(b) {
        return false;
    }
    let left = significant_children(a);
    let right = significant_children(b);
    left.len() == right.len()
        && left.iter().zip(right.iter()).all(|pair| match pair {
            (Content::Element(x), Content::Element(y)) => deep_equals(*x, *y),
            (Content::Text(x), Content::Text(y)) => x == y,
            _ => false,
        })
}

/// Whether every path resolves on both sides to deep-equal elements.
pub fn fields_equal(incoming: Element<'_>, recorded: Element<'_>, paths: &[Vec<String>]) -> bool {
    paths.iter().all(|segments| {
        match (find_node(incoming, segments), find_node(recorded, segments)) {
            (Some(left), Some(right)) => deep_equals(left, right),
            _ => false,
        }
    })
}

/// SOAP operation name: the first element inside the envelope body, with a
/// trailing `Request` removed.
pub fn soap_action(envelope: &str) -> Result<String, MatchError> {
    let package = parse_body(envelope, BodyOrigin::Incoming)?;
    let root = root_element(&package)
        .ok_or_else(|| MatchError::parse(BodyKind::Xml, BodyOrigin::Incoming, "no root element"))?;
    let body = std::iter::once(root)
        .chain(descendants(root))
        .find(|e| {
            e.name().local_part() == "Body"
                && matches!(
                    e.name().namespace_uri(),
                    Some(SOAP11_ENVELOPE_NS) | Some(SOAP12_ENVELOPE_NS)
                )
        })
        .ok_or_else(|| {
            MatchError::parse(BodyKind::Xml, BodyOrigin::Incoming, "missing SOAP Body element")
        })?;
    let operation = child_elements(body).next().ok_or_else(|| {
        MatchError::parse(BodyKind::Xml, BodyOrigin::Incoming, "empty SOAP Body element")
    })?;
    let name = operation.name().local_part();
    Ok(name.strip_suffix("Request").unwrap_or(name).to_string())
}
