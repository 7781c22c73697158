//! Qualified names — the universal identifier for statements and types.
//!
//! A [`QName`] is a `(namespace, revision, local name)` triple. Namespace URIs
//! are interned in a process-wide table so that every `QNameModule` clone is a
//! cheap `Arc` bump and equality checks do not walk the URI text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QNameError {
    #[error("invalid local name '{0}'")]
    InvalidLocalName(String),
    #[error("invalid revision date '{0}', expected YYYY-MM-DD")]
    InvalidRevision(String),
}

// ── Namespace interning ─────────────────────────────────────────────

// Process-lifetime intern table: created on first use, never evicted.
static NAMESPACE_INTERN: OnceLock<Mutex<HashSet<Arc<str>>>> = OnceLock::new();

fn intern(uri: &str) -> Arc<str> {
    let table = NAMESPACE_INTERN.get_or_init(|| Mutex::new(HashSet::new()));
    let mut guard = table.lock().expect("namespace intern table poisoned");
    if let Some(existing) = guard.get(uri) {
        return existing.clone();
    }
    let arc: Arc<str> = Arc::from(uri);
    guard.insert(arc.clone());
    arc
}

/// An interned XML namespace URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XmlNamespace(Arc<str>);

impl XmlNamespace {
    pub fn of(uri: &str) -> Self {
        XmlNamespace(intern(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for XmlNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Revision ────────────────────────────────────────────────────────

/// A module revision date (`YYYY-MM-DD`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(NaiveDate);

impl Revision {
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl FromStr for Revision {
    type Err = QNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Revision)
            .map_err(|_| QNameError::InvalidRevision(s.to_string()))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

// ── QNameModule / QName ─────────────────────────────────────────────

/// The `(namespace, revision)` pair identifying one module revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QNameModule {
    pub namespace: XmlNamespace,
    pub revision: Option<Revision>,
}

impl QNameModule {
    pub fn new(namespace: XmlNamespace, revision: Option<Revision>) -> Self {
        QNameModule { namespace, revision }
    }

    pub fn without_revision(&self) -> QNameModule {
        QNameModule { namespace: self.namespace.clone(), revision: None }
    }
}

impl fmt::Display for QNameModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}@{}", self.namespace, rev),
            None => write!(f, "{}", self.namespace),
        }
    }
}

/// A fully qualified statement name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub module: QNameModule,
    pub local_name: Arc<str>,
}

impl QName {
    /// Create a qualified name, validating the local name against the
    /// modeling language's identifier rules.
    pub fn new(module: QNameModule, local_name: &str) -> Result<Self, QNameError> {
        if !is_valid_identifier(local_name) {
            return Err(QNameError::InvalidLocalName(local_name.to_string()));
        }
        Ok(QName { module, local_name: Arc::from(local_name) })
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.module, self.local_name)
    }
}

/// Identifier rule: leading alpha or underscore, then alphanumerics,
/// underscores, hyphens and dots.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_interning() {
        let a = XmlNamespace::of("urn:example:foo");
        let b = XmlNamespace::of("urn:example:foo");
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn test_revision_parse_and_format() {
        let rev: Revision = "2024-01-15".parse().unwrap();
        assert_eq!(rev.to_string(), "2024-01-15");
        assert!("2024-13-01".parse::<Revision>().is_err());
        assert!("garbage".parse::<Revision>().is_err());
    }

    #[test]
    fn test_revision_ordering() {
        let older: Revision = "2020-01-01".parse().unwrap();
        let newer: Revision = "2024-06-30".parse().unwrap();
        assert!(older < newer);
    }

    #[test]
    fn test_qname_validation() {
        let module = QNameModule::new(XmlNamespace::of("urn:example:foo"), None);
        assert!(QName::new(module.clone(), "valid-name").is_ok());
        assert!(QName::new(module.clone(), "_also.valid").is_ok());
        assert!(QName::new(module.clone(), "1bad").is_err());
        assert!(QName::new(module.clone(), "").is_err());
        assert!(QName::new(module, "has space").is_err());
    }

    #[test]
    fn test_qname_equality_is_structural() {
        let module = QNameModule::new(
            XmlNamespace::of("urn:example:bar"),
            Some("2023-03-03".parse().unwrap()),
        );
        let a = QName::new(module.clone(), "leaf-x").unwrap();
        let b = QName::new(module, "leaf-x").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        let module = QNameModule::new(
            XmlNamespace::of("urn:example:foo"),
            Some("2024-01-15".parse().unwrap()),
        );
        let q = QName::new(module, "c").unwrap();
        assert_eq!(q.to_string(), "(urn:example:foo@2024-01-15)c");
    }
}
