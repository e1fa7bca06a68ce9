//! Request-to-mock matching.
//!
//! - `path` - static and `(*)` wildcard path patterns
//! - `query` - query string containment
//! - `json` / `xml` - field-path body comparison
//! - `content` - candidate selection by body
//! - `repository` - the mock index serving lookups

pub mod content;
mod error;
pub mod json;
pub mod path;
pub mod query;
mod repository;
pub mod xml;

pub use content::ContentMatcher;
pub use error::{BodyKind, BodyOrigin, MatchError};
pub use path::{is_dynamic, normalize_path, PathPattern, WILDCARD};
pub use query::{parse_query, QueryPattern};
pub use repository::{IndexStats, MatchRepository};
