//! Source identity and statement source references.

use crate::qname::Revision;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies one schema source document (e.g. `foo` or `foo@2024-01-15`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceIdentifier {
    pub name: Arc<str>,
    pub revision: Option<Revision>,
}

impl SourceIdentifier {
    pub fn new(name: &str) -> Self {
        SourceIdentifier { name: Arc::from(name), revision: None }
    }

    pub fn with_revision(name: &str, revision: Revision) -> Self {
        SourceIdentifier { name: Arc::from(name), revision: Some(revision) }
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}@{}", self.name, rev),
            None => f.write_str(&self.name),
        }
    }
}

/// Points at the statement text a diagnostic refers to.
///
/// Every statement context carries one of these; all build errors surface
/// them so users can locate the offending statement without re-deriving it
/// from the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSourceRef {
    pub source: SourceIdentifier,
    pub line: usize,
    pub col: usize,
}

impl StatementSourceRef {
    pub fn new(source: SourceIdentifier, line: usize, col: usize) -> Self {
        StatementSourceRef { source, line, col }
    }
}

impl fmt::Display for StatementSourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_identifier_display() {
        assert_eq!(SourceIdentifier::new("foo").to_string(), "foo");
        let rev = "2024-01-15".parse().unwrap();
        assert_eq!(
            SourceIdentifier::with_revision("foo", rev).to_string(),
            "foo@2024-01-15"
        );
    }

    #[test]
    fn test_source_ref_display() {
        let sref = StatementSourceRef::new(SourceIdentifier::new("foo"), 3, 5);
        assert_eq!(sref.to_string(), "foo:3:5");
    }
}
