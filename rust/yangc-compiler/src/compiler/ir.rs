//! Statement IR — the already-parsed, unvalidated statement tree.
//!
//! One tree per source document. The reactor never reads text, files or
//! transports: a loader hands it `IrStatement` roots and is responsible for
//! having tokenized the source. The builder methods exist for loaders and
//! tests; the tree is read-only once handed to the reactor.

use serde::{Deserialize, Serialize};

/// One node of the generic statement tree: `keyword [argument] { children }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrStatement {
    pub keyword: String,
    pub argument: Option<String>,
    pub substatements: Vec<IrStatement>,
    pub line: usize,
    pub col: usize,
}

impl IrStatement {
    pub fn new(keyword: &str, argument: Option<&str>) -> Self {
        IrStatement {
            keyword: keyword.to_string(),
            argument: argument.map(str::to_string),
            substatements: Vec::new(),
            line: 0,
            col: 0,
        }
    }

    /// Attach a source position (1-based line and column).
    pub fn at(mut self, line: usize, col: usize) -> Self {
        self.line = line;
        self.col = col;
        self
    }

    /// Append one substatement, preserving insertion order.
    pub fn with(mut self, sub: IrStatement) -> Self {
        self.substatements.push(sub);
        self
    }

    /// Append several substatements.
    pub fn with_all(mut self, subs: impl IntoIterator<Item = IrStatement>) -> Self {
        self.substatements.extend(subs);
        self
    }

    /// First substatement with the given keyword, if any.
    pub fn find(&self, keyword: &str) -> Option<&IrStatement> {
        self.substatements.iter().find(|s| s.keyword == keyword)
    }

    /// Total number of statements in this subtree, including self.
    pub fn statement_count(&self) -> usize {
        1 + self.substatements.iter().map(IrStatement::statement_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_order() {
        let ir = IrStatement::new("module", Some("foo"))
            .with(IrStatement::new("namespace", Some("urn:foo")))
            .with(IrStatement::new("prefix", Some("f")))
            .with(IrStatement::new("container", Some("c")));
        let keywords: Vec<&str> =
            ir.substatements.iter().map(|s| s.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["namespace", "prefix", "container"]);
    }

    #[test]
    fn test_find_and_count() {
        let ir = IrStatement::new("container", Some("c"))
            .with(IrStatement::new("leaf", Some("x")).with(IrStatement::new("type", Some("string"))));
        assert!(ir.find("leaf").is_some());
        assert!(ir.find("list").is_none());
        assert_eq!(ir.statement_count(), 3);
    }
}
