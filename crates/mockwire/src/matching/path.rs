//! URL path matching with `(*)` wildcard segments.
//!
//! Mock URLs are classified once when the repository is built: a path with no
//! wildcard segment is *static* and matched by string equality, otherwise it
//! is *dynamic* and matched segment by segment.

/// Placeholder matching any single path segment or query value.
pub const WILDCARD: &str = "(*)";

/// Lower-case a URL and drop its query string.
pub fn normalize_path(url: &str) -> String {
    let lower = url.to_lowercase();
    match lower.find('?') {
        Some(pos) => lower[..pos].to_string(),
        None => lower,
    }
}

/// Whether any `/`-separated segment of `path` is the wildcard token.
pub fn is_dynamic(path: &str) -> bool {
    path.split('/').any(|segment| segment == WILDCARD)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Wildcard,
}

/// Compiled path pattern for efficient runtime evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Static(String),
    Dynamic(Vec<Segment>),
}

impl PathPattern {
    /// Compile a mock URL path. The query string, if any, is ignored.
    pub fn compile(url: &str) -> Self {
        let path = normalize_path(url);
        if !is_dynamic(&path) {
            return PathPattern::Static(path);
        }
        let segments = path
            .split('/')
            .map(|segment| {
                if segment == WILDCARD {
                    Segment::Wildcard
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();
        PathPattern::Dynamic(segments)
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, PathPattern::Dynamic(_))
    }

    /// Check if an incoming path (query already stripped) matches.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Static(expected) => path.to_lowercase() == *expected,
            PathPattern::Dynamic(segments) => {
                let incoming: Vec<&str> = path.split('/').collect();
                if incoming.len() != segments.len() {
                    return false;
                }
                segments
                    .iter()
                    .zip(incoming)
                    .all(|(segment, actual)| match segment {
                        Segment::Wildcard => true,
                        Segment::Literal(expected) => actual.to_lowercase() == *expected,
                    })
            }
        }
    }
}
