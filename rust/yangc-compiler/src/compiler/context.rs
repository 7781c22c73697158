//! Statement contexts — the mutable, in-progress statement graph.
//!
//! One context exists per IR statement occurrence, plus one per statement
//! synthesized by `uses`/`augment` expansion. Contexts live in an arena owned
//! by the build and are addressed by [`CtxId`] handles; parent/child edges
//! are ids, so copies and cross-tree references never fight the borrow
//! checker. The arena is dropped wholesale when the build ends.

use crate::compiler::copy_history::{CopyHistory, CopyType};
use crate::compiler::ir::IrStatement;
use crate::compiler::namespace::{NamespaceId, NsEntry, NsKey};
use crate::compiler::phase::ModelProcessingPhase;
use crate::compiler::support::Argument;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::{Index, IndexMut};
use yangc_core::{SourceIdentifier, StatementSourceRef};

/// Stable handle to one statement context. Identity is the handle, not the
/// keyword/argument pair: two statements with equal text are distinct
/// contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CtxId(pub(crate) usize);

impl CtxId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One statement occurrence during a build.
#[derive(Debug)]
pub struct StatementContext {
    pub keyword: String,
    pub raw_argument: Option<String>,
    /// Populated during `PRE_LINKAGE` for header kinds, otherwise during
    /// `STATEMENT_DEFINITION`. Namespace lookups keyed by the argument must
    /// not run before this is set.
    pub argument: Option<Argument>,
    pub phase: ModelProcessingPhase,
    pub copy_history: CopyHistory,
    pub parent: Option<CtxId>,
    /// Substatements as originally written, in declaration order.
    pub declared: Vec<CtxId>,
    /// Substatements injected by resolution (uses expansion, augment
    /// splicing), in injection order.
    pub injected: Vec<CtxId>,
    pub sref: StatementSourceRef,
    /// The root (module/submodule) context this statement belongs to.
    /// Roots point at themselves.
    pub root: CtxId,
    /// Lazily created namespace storage slots anchored at this context.
    pub tables: HashMap<NamespaceId, BTreeMap<NsKey, NsEntry>>,
    /// For copies: the context this one was copied from.
    pub copied_from: Option<CtxId>,
    /// For top-level expansion copies: the `uses` statement whose expansion
    /// produced this context. Links copies back to the instantiation chain
    /// for cycle detection.
    pub expanded_via: Option<CtxId>,
    /// Re-entry guard for on-demand child materialization.
    pub expanding: bool,
    /// Set once a `uses` context has been expanded; expansion is idempotent.
    pub expanded: bool,
}

impl StatementContext {
    /// The namespace table anchored at this context, creating it on first
    /// use.
    pub fn table_mut(&mut self, ns: NamespaceId) -> &mut BTreeMap<NsKey, NsEntry> {
        self.tables.entry(ns).or_default()
    }

    pub fn table(&self, ns: NamespaceId) -> Option<&BTreeMap<NsKey, NsEntry>> {
        self.tables.get(&ns)
    }
}

/// Arena of statement contexts for one build.
#[derive(Debug, Default)]
pub struct ContextArena {
    nodes: Vec<StatementContext>,
}

impl ContextArena {
    pub fn new() -> Self {
        ContextArena::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All context ids in creation order. Creation order is deterministic:
    /// ingestion order for declared statements, expansion order for copies.
    pub fn ids(&self) -> impl Iterator<Item = CtxId> {
        (0..self.nodes.len()).map(CtxId)
    }

    fn alloc(&mut self, node: StatementContext) -> CtxId {
        let id = CtxId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Recursively ingest one IR tree as a new root context.
    pub fn ingest(&mut self, ir: &IrStatement, source: &SourceIdentifier) -> CtxId {
        // The root's `root` field must point at itself; patch after alloc.
        let root = self.ingest_at(ir, None, CtxId(self.nodes.len()), source);
        debug_assert_eq!(self.nodes[root.0].root, root);
        root
    }

    fn ingest_at(
        &mut self,
        ir: &IrStatement,
        parent: Option<CtxId>,
        root: CtxId,
        source: &SourceIdentifier,
    ) -> CtxId {
        let id = self.alloc(StatementContext {
            keyword: ir.keyword.clone(),
            raw_argument: ir.argument.clone(),
            argument: None,
            phase: ModelProcessingPhase::Init,
            copy_history: CopyHistory::original(),
            parent,
            declared: Vec::new(),
            injected: Vec::new(),
            sref: StatementSourceRef::new(source.clone(), ir.line, ir.col),
            root,
            tables: HashMap::new(),
            copied_from: None,
            expanded_via: None,
            expanding: false,
            expanded: false,
        });
        for sub in &ir.substatements {
            let child = self.ingest_at(sub, Some(id), root, source);
            self.nodes[id.0].declared.push(child);
        }
        id
    }

    /// Declared substatements followed by injected ones. Order within each
    /// group is preserved exactly; codegen downstream depends on it.
    pub fn effective_substatements(&self, id: CtxId) -> Vec<CtxId> {
        let node = &self.nodes[id.0];
        let mut out = Vec::with_capacity(node.declared.len() + node.injected.len());
        out.extend_from_slice(&node.declared);
        out.extend_from_slice(&node.injected);
        out
    }

    /// Walk parent links to the nearest root context.
    pub fn root_of(&self, id: CtxId) -> CtxId {
        self.nodes[id.0].root
    }

    /// Parent chain from `id` (exclusive) up to the root (inclusive).
    pub fn ancestors(&self, id: CtxId) -> Vec<CtxId> {
        let mut out = Vec::new();
        let mut cur = self.nodes[id.0].parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.nodes[p.0].parent;
        }
        out
    }

    /// Chase `copied_from` links back to the originally declared context.
    pub fn origin(&self, id: CtxId) -> CtxId {
        let mut cur = id;
        while let Some(src) = self.nodes[cur.0].copied_from {
            cur = src;
        }
        cur
    }

    /// True if any ancestor has the given keyword.
    pub fn has_ancestor_keyword(&self, id: CtxId, keyword: &str) -> bool {
        self.ancestors(id).iter().any(|a| self.nodes[a.0].keyword == keyword)
    }

    /// The original grouping-definition contexts enclosing `id`, across
    /// parent links, copy provenance and the expansion chain. Used for
    /// circular-`uses` detection: expanding a grouping that is already part
    /// of this set is a cycle.
    pub fn expansion_ancestry(&self, id: CtxId) -> HashSet<CtxId> {
        let mut out = HashSet::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            let node = &self.nodes[c.0];
            if node.keyword == "grouping" {
                out.insert(self.origin(c));
            }
            if let Some(p) = node.parent {
                stack.push(p);
            }
            if let Some(o) = node.copied_from {
                stack.push(o);
            }
            if let Some(u) = node.expanded_via {
                stack.push(u);
            }
        }
        out
    }

    /// Deep-copy `src` (and its whole subtree) as a new injected child of
    /// `parent`, tagging every copied context with `reason` merged into its
    /// existing history.
    pub fn copy_as_child_of(&mut self, src: CtxId, parent: CtxId, reason: CopyType) -> CtxId {
        let root = self.root_of(parent);
        let copy = self.copy_rec(src, parent, root, reason);
        self.nodes[parent.0].injected.push(copy);
        copy
    }

    fn copy_rec(&mut self, src: CtxId, parent: CtxId, root: CtxId, reason: CopyType) -> CtxId {
        let (node_fields, declared, injected) = {
            let node = &self.nodes[src.0];
            (
                StatementContext {
                    keyword: node.keyword.clone(),
                    raw_argument: node.raw_argument.clone(),
                    argument: node.argument.clone(),
                    phase: node.phase,
                    copy_history: node.copy_history.with(reason),
                    parent: Some(parent),
                    declared: Vec::new(),
                    injected: Vec::new(),
                    sref: node.sref.clone(),
                    root,
                    tables: HashMap::new(),
                    copied_from: Some(src),
                    expanded_via: None,
                    expanding: false,
                    expanded: false,
                },
                node.declared.clone(),
                node.injected.clone(),
            )
        };
        let id = self.alloc(node_fields);
        for child in declared {
            let c = self.copy_rec(child, id, root, reason);
            self.nodes[id.0].declared.push(c);
        }
        for child in injected {
            let c = self.copy_rec(child, id, root, reason);
            self.nodes[id.0].injected.push(c);
        }
        id
    }

    /// Merge extra copy-history tags into `id` and its whole subtree.
    /// Used when contents pass through several copy mechanisms at once.
    pub fn merge_history(&mut self, id: CtxId, extra: CopyHistory) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let node = &mut self.nodes[cur.0];
            node.copy_history = node.copy_history.merge(extra);
            stack.extend_from_slice(&node.declared);
            stack.extend_from_slice(&node.injected);
        }
    }

    /// Advance a context's phase. Phases are monotonic; regressions are a
    /// reactor bug.
    pub fn set_phase(&mut self, id: CtxId, phase: ModelProcessingPhase) {
        let node = &mut self.nodes[id.0];
        assert!(
            node.phase <= phase,
            "phase regression on {}: {} -> {}",
            node.sref,
            node.phase,
            phase
        );
        node.phase = phase;
    }
}

impl Index<CtxId> for ContextArena {
    type Output = StatementContext;

    fn index(&self, id: CtxId) -> &StatementContext {
        &self.nodes[id.0]
    }
}

impl IndexMut<CtxId> for ContextArena {
    fn index_mut(&mut self, id: CtxId) -> &mut StatementContext {
        &mut self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::IrStatement;

    fn sample_arena() -> (ContextArena, CtxId) {
        let ir = IrStatement::new("module", Some("foo"))
            .with(IrStatement::new("namespace", Some("urn:foo")))
            .with(
                IrStatement::new("container", Some("c"))
                    .with(IrStatement::new("leaf", Some("x"))),
            );
        let mut arena = ContextArena::new();
        let root = arena.ingest(&ir, &SourceIdentifier::new("foo"));
        (arena, root)
    }

    #[test]
    fn test_ingest_builds_tree() {
        let (arena, root) = sample_arena();
        assert_eq!(arena[root].keyword, "module");
        assert_eq!(arena[root].declared.len(), 2);
        assert!(arena[root].parent.is_none());
        assert_eq!(arena.root_of(root), root);

        let container = arena[root].declared[1];
        assert_eq!(arena[container].keyword, "container");
        assert_eq!(arena.root_of(container), root);
        let leaf = arena[container].declared[0];
        assert_eq!(arena.ancestors(leaf), vec![container, root]);
    }

    #[test]
    fn test_copy_preserves_order_and_tags() {
        let (mut arena, root) = sample_arena();
        let container = arena[root].declared[1];

        let target = arena.ingest(
            &IrStatement::new("module", Some("bar")),
            &SourceIdentifier::new("bar"),
        );
        let copy = arena.copy_as_child_of(container, target, CopyType::AddedByUses);

        assert_eq!(arena[target].injected, vec![copy]);
        assert!(arena[copy].copy_history.contains(CopyType::AddedByUses));
        assert_eq!(arena[copy].declared.len(), 1);
        assert_eq!(arena.root_of(copy), target);
        // The original is untouched.
        assert!(arena[container].copy_history.is_original());
        assert_eq!(arena[container].parent, Some(root));
        // Copy provenance is recorded transitively.
        let leaf_copy = arena[copy].declared[0];
        assert_eq!(arena.origin(leaf_copy), arena[container].declared[0]);
    }

    #[test]
    fn test_effective_substatements_declared_first() {
        let (mut arena, root) = sample_arena();
        let container = arena[root].declared[1];
        let extra = arena.ingest(
            &IrStatement::new("leaf", Some("y")),
            &SourceIdentifier::new("foo"),
        );
        arena[container].injected.push(extra);
        let subs = arena.effective_substatements(container);
        assert_eq!(subs.len(), 2);
        assert_eq!(arena[subs[0]].raw_argument.as_deref(), Some("x"));
        assert_eq!(arena[subs[1]].raw_argument.as_deref(), Some("y"));
    }

    #[test]
    #[should_panic(expected = "phase regression")]
    fn test_phase_regression_panics() {
        let (mut arena, root) = sample_arena();
        arena.set_phase(root, ModelProcessingPhase::Linkage);
        arena.set_phase(root, ModelProcessingPhase::PreLinkage);
    }
}
