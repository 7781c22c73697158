//! Statement support framework.
//!
//! Every statement keyword is handled by a [`StatementSupport`]: it parses
//! the raw argument into a typed [`Argument`], declares the substatement
//! grammar, and participates in phase transitions through optional hooks.
//! Supports live in a flat [`SupportRegistry`] keyed by keyword, so new
//! statement kinds (extensions) are added without touching the reactor.

use crate::compiler::context::CtxId;
use crate::compiler::copy_history::CopyHistory;
use crate::compiler::effective::EffectiveStatement;
use crate::compiler::namespace::NamespaceId;
use crate::compiler::reactor::{Modifier, Reactor};
use crate::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use yangc_core::{QName, Revision, StatementSourceRef};

// ── Typed arguments ─────────────────────────────────────────────────

/// A possibly-prefixed node name, e.g. `g` or `other:g`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeName {
    pub prefix: Option<String>,
    pub name: String,
}

impl NodeName {
    pub fn parse(raw: &str) -> Option<NodeName> {
        let (prefix, name) = match raw.split_once(':') {
            Some((p, n)) => (Some(p.to_string()), n),
            None => (None, raw),
        };
        if !yangc_core::qname::is_valid_identifier(name) {
            return None;
        }
        if let Some(ref p) = prefix {
            if !yangc_core::qname::is_valid_identifier(p) {
                return None;
            }
        }
        Some(NodeName { prefix, name: name.to_string() })
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A schema node identifier: an absolute (`/a/b`) or relative (`a/b`) path
/// of node names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNodeId {
    pub absolute: bool,
    pub path: Vec<NodeName>,
}

impl SchemaNodeId {
    pub fn parse(raw: &str) -> Option<SchemaNodeId> {
        let (absolute, rest) = match raw.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if rest.is_empty() {
            return None;
        }
        let mut path = Vec::new();
        for step in rest.split('/') {
            path.push(NodeName::parse(step)?);
        }
        Some(SchemaNodeId { absolute, path })
    }
}

impl fmt::Display for SchemaNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.path.iter().enumerate() {
            if self.absolute || i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// The parsed form of a statement argument. Which variant a statement
/// produces is fixed by its support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argument {
    /// Statement takes no argument (e.g. `input`).
    None,
    /// A plain identifier (module names, prefixes, node names).
    Identifier(String),
    /// Free text (descriptions, references, defaults).
    Text(String),
    /// A namespace URI.
    Uri(String),
    /// A revision date.
    Revision(Revision),
    /// A possibly-prefixed reference to a named statement.
    NodeName(NodeName),
    /// A schema node identifier path.
    SchemaNodeId(SchemaNodeId),
    /// `true` / `false`.
    Boolean(bool),
}

// ── Substatement grammar ────────────────────────────────────────────

/// Cardinality of a substatement within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly once.
    Mandatory,
    /// At most once.
    Optional,
    /// Any number of occurrences.
    ZeroOrMore,
    /// At least once.
    OneOrMore,
}

impl Cardinality {
    pub fn check(self, count: usize) -> bool {
        match self {
            Cardinality::Mandatory => count == 1,
            Cardinality::Optional => count <= 1,
            Cardinality::ZeroOrMore => true,
            Cardinality::OneOrMore => count >= 1,
        }
    }
}

/// One row of a support's substatement grammar table.
pub type GrammarRow = (&'static str, Cardinality);

// ── Statement support ───────────────────────────────────────────────

/// Per-keyword statement handler.
///
/// Hooks default to no-ops; only the small set of statement kinds that
/// populate global namespaces or perform cross-reference splicing override
/// them. Hooks run once per context during the corresponding phase and may
/// defer work by returning a [`Modifier`].
pub trait StatementSupport: Send + Sync {
    fn keyword(&self) -> &'static str;

    /// Parse the raw argument into its typed form. Invoked once per context,
    /// during `PRE_LINKAGE` for header statements and `STATEMENT_DEFINITION`
    /// for everything else.
    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError>;

    /// Declarative substatement cardinality table. Keywords not listed are
    /// accepted without a count check.
    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        &[]
    }

    /// Whether this statement forms a schema-tree (data) node and registers
    /// itself with its parent's child namespace.
    fn is_data_node(&self) -> bool {
        false
    }

    /// The symbol namespace this statement registers its name into during
    /// `STATEMENT_DEFINITION` (groupings, typedefs, identities).
    fn symbol_namespace(&self) -> Option<NamespaceId> {
        None
    }

    fn on_pre_linkage(&self, _build: &mut Reactor, _ctx: CtxId) -> Result<(), BuildError> {
        Ok(())
    }

    fn on_linkage(
        &self,
        _build: &mut Reactor,
        _ctx: CtxId,
    ) -> Result<Option<Modifier>, BuildError> {
        Ok(None)
    }

    fn on_full_declaration(
        &self,
        _build: &mut Reactor,
        _ctx: CtxId,
    ) -> Result<Option<Modifier>, BuildError> {
        Ok(None)
    }

    /// Freeze one context into its effective form. Invoked exactly once per
    /// context during `EFFECTIVE_MODEL`, with substatements already frozen.
    fn build_effective(
        &self,
        keyword: &str,
        argument: Option<Argument>,
        qname: Option<QName>,
        copy_history: CopyHistory,
        substatements: Vec<Arc<EffectiveStatement>>,
    ) -> EffectiveStatement {
        EffectiveStatement {
            keyword: keyword.to_string(),
            argument,
            qname,
            copy_history,
            substatements,
        }
    }
}

/// Helper shared by supports whose argument is a mandatory identifier.
pub fn parse_identifier_argument(
    keyword: &str,
    raw: Option<&str>,
    sref: &StatementSourceRef,
) -> Result<Argument, BuildError> {
    match raw {
        Some(s) if yangc_core::qname::is_valid_identifier(s) => {
            Ok(Argument::Identifier(s.to_string()))
        }
        Some(s) => Err(BuildError::Syntax {
            message: format!("'{}' argument '{}' is not a valid identifier", keyword, s),
            sref: sref.clone(),
        }),
        None => Err(BuildError::Syntax {
            message: format!("'{}' statement requires an argument", keyword),
            sref: sref.clone(),
        }),
    }
}

/// Helper for supports whose argument is mandatory free text.
pub fn parse_text_argument(
    keyword: &str,
    raw: Option<&str>,
    sref: &StatementSourceRef,
) -> Result<Argument, BuildError> {
    match raw {
        Some(s) => Ok(Argument::Text(s.to_string())),
        None => Err(BuildError::Syntax {
            message: format!("'{}' statement requires an argument", keyword),
            sref: sref.clone(),
        }),
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Flat keyword → support table.
///
/// Lookup falls back to an extension support for unknown keywords, so
/// model-defined statements pass through the reactor untouched.
pub struct SupportRegistry {
    supports: HashMap<&'static str, Arc<dyn StatementSupport>>,
    extension_fallback: Arc<dyn StatementSupport>,
}

impl SupportRegistry {
    pub fn new(extension_fallback: Arc<dyn StatementSupport>) -> Self {
        SupportRegistry { supports: HashMap::new(), extension_fallback }
    }

    pub fn register(&mut self, support: Arc<dyn StatementSupport>) {
        self.supports.insert(support.keyword(), support);
    }

    pub fn get(&self, keyword: &str) -> Arc<dyn StatementSupport> {
        self.supports
            .get(keyword)
            .cloned()
            .unwrap_or_else(|| self.extension_fallback.clone())
    }

    pub fn is_known(&self, keyword: &str) -> bool {
        self.supports.contains_key(keyword)
    }
}
