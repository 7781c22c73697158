//! Build-time namespaces: scoped lookup tables used during resolution.
//!
//! Each [`NamespaceId`] names one kind of table and carries a storage
//! behaviour deciding where the table physically lives relative to the
//! context performing the access:
//!
//! - `Global` — one table per build, anchored at the build itself.
//! - `SourceLocal` — one table per root (module/submodule) context.
//! - `StatementLocal` — the calling context's own table; with `inherit`,
//!   lookups also walk ancestor scopes (grouping/typedef visibility).
//!
//! The derived child-schema-node lookup (statement-local storage plus
//! on-demand `uses` expansion on miss) layers on top of these tables; see
//! `supports::find_child_schema_node`.
//!
//! Inserting a second value under an occupied key is a structured collision
//! error naming both occurrences' source references.

use crate::compiler::context::{ContextArena, CtxId};
use crate::BuildError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use yangc_core::{QName, QNameModule, StatementSourceRef, XmlNamespace};

/// Identifies one kind of lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceId {
    /// module name → root context. Global.
    ModuleByName,
    /// submodule name → root context. Global.
    SubmoduleByName,
    /// namespace URI → module root context. Global; duplicate registration
    /// means two modules claim the same namespace.
    ModuleNamespace,
    /// module/submodule root context → its QNameModule. Global.
    ModuleToQNameModule,
    /// prefix → QNameModule, as visible inside one source. Source-local.
    PrefixToModule,
    /// prefix → imported module's root context. Source-local.
    ImportedModule,
    /// submodule name → included submodule's root context. Source-local.
    IncludedSubmodule,
    /// owning module name → module root context, registered on a submodule
    /// root when an include resolves. Source-local.
    BelongsToModule,
    /// grouping name → defining context. Statement-local, inherited.
    Grouping,
    /// typedef name → defining context. Statement-local, inherited.
    Typedef,
    /// identity QName → defining context. Global.
    Identity,
    /// schema-tree child name → child context. Statement-local, not
    /// inherited; the backing table of the derived child lookup.
    SchemaTreeChild,
}

/// Where a namespace's table is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceBehaviour {
    Global,
    SourceLocal,
    StatementLocal { inherit: bool },
}

impl NamespaceId {
    pub fn behaviour(self) -> NamespaceBehaviour {
        match self {
            NamespaceId::ModuleByName
            | NamespaceId::SubmoduleByName
            | NamespaceId::ModuleNamespace
            | NamespaceId::ModuleToQNameModule
            | NamespaceId::Identity => NamespaceBehaviour::Global,
            NamespaceId::PrefixToModule
            | NamespaceId::ImportedModule
            | NamespaceId::IncludedSubmodule
            | NamespaceId::BelongsToModule => NamespaceBehaviour::SourceLocal,
            NamespaceId::Grouping | NamespaceId::Typedef => {
                NamespaceBehaviour::StatementLocal { inherit: true }
            }
            NamespaceId::SchemaTreeChild => NamespaceBehaviour::StatementLocal { inherit: false },
        }
    }
}

/// Namespace table key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NsKey {
    Name(String),
    Prefix(String),
    Namespace(XmlNamespace),
    QName(QName),
    Ctx(CtxId),
}

impl fmt::Display for NsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NsKey::Name(s) | NsKey::Prefix(s) => f.write_str(s),
            NsKey::Namespace(ns) => write!(f, "{}", ns),
            NsKey::QName(q) => write!(f, "{}", q),
            NsKey::Ctx(id) => write!(f, "#{}", id.index()),
        }
    }
}

/// Namespace table value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NsValue {
    Ctx(CtxId),
    Module(QNameModule),
    Prefix(String),
}

impl NsValue {
    pub fn as_ctx(&self) -> Option<CtxId> {
        match self {
            NsValue::Ctx(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&QNameModule> {
        match self {
            NsValue::Module(m) => Some(m),
            _ => None,
        }
    }
}

/// A stored value plus the source reference of the statement that put it
/// there, kept for collision diagnostics.
#[derive(Debug, Clone)]
pub struct NsEntry {
    pub value: NsValue,
    pub sref: StatementSourceRef,
}

/// The build-wide (global) tables. Source-local and statement-local tables
/// live on their anchor contexts.
#[derive(Debug, Default)]
pub struct NamespaceStorage {
    global: HashMap<NamespaceId, BTreeMap<NsKey, NsEntry>>,
}

impl NamespaceStorage {
    pub fn new() -> Self {
        NamespaceStorage::default()
    }

    pub fn table(&self, ns: NamespaceId) -> Option<&BTreeMap<NsKey, NsEntry>> {
        self.global.get(&ns)
    }

    fn table_mut(&mut self, ns: NamespaceId) -> &mut BTreeMap<NsKey, NsEntry> {
        self.global.entry(ns).or_default()
    }
}

fn insert_checked(
    table: &mut BTreeMap<NsKey, NsEntry>,
    key: NsKey,
    entry: NsEntry,
) -> Result<(), BuildError> {
    if let Some(existing) = table.get(&key) {
        return Err(BuildError::Collision {
            name: key.to_string(),
            first: existing.sref.clone(),
            second: entry.sref,
        });
    }
    table.insert(key, entry);
    Ok(())
}

/// Insert `value` under `key` into the namespace `ns`, anchored at `anchor`.
pub fn put(
    arena: &mut ContextArena,
    storage: &mut NamespaceStorage,
    anchor: CtxId,
    ns: NamespaceId,
    key: NsKey,
    value: NsValue,
    sref: StatementSourceRef,
) -> Result<(), BuildError> {
    let entry = NsEntry { value, sref };
    match ns.behaviour() {
        NamespaceBehaviour::Global => insert_checked(storage.table_mut(ns), key, entry),
        NamespaceBehaviour::SourceLocal => {
            let root = arena.root_of(anchor);
            insert_checked(arena[root].table_mut(ns), key, entry)
        }
        NamespaceBehaviour::StatementLocal { .. } => {
            insert_checked(arena[anchor].table_mut(ns), key, entry)
        }
    }
}

/// Look up `key` in the namespace `ns` as seen from `anchor`. Inherited
/// statement-local namespaces walk ancestor scopes, nearest first.
pub fn get(
    arena: &ContextArena,
    storage: &NamespaceStorage,
    anchor: CtxId,
    ns: NamespaceId,
    key: &NsKey,
) -> Option<NsValue> {
    match ns.behaviour() {
        NamespaceBehaviour::Global => {
            storage.table(ns).and_then(|t| t.get(key)).map(|e| e.value.clone())
        }
        NamespaceBehaviour::SourceLocal => {
            let root = arena.root_of(anchor);
            arena[root].table(ns).and_then(|t| t.get(key)).map(|e| e.value.clone())
        }
        NamespaceBehaviour::StatementLocal { inherit } => {
            if let Some(found) =
                arena[anchor].table(ns).and_then(|t| t.get(key)).map(|e| e.value.clone())
            {
                return Some(found);
            }
            if !inherit {
                return None;
            }
            for ancestor in arena.ancestors(anchor) {
                if let Some(found) =
                    arena[ancestor].table(ns).and_then(|t| t.get(key)).map(|e| e.value.clone())
                {
                    return Some(found);
                }
            }
            None
        }
    }
}

/// All keys of an inherited statement-local namespace visible from `anchor`,
/// nearest scope first. Used for "did you mean" candidates in diagnostics.
pub fn visible_names(arena: &ContextArena, anchor: CtxId, ns: NamespaceId) -> Vec<String> {
    let mut out = Vec::new();
    let mut scopes = vec![anchor];
    scopes.extend(arena.ancestors(anchor));
    for scope in scopes {
        if let Some(table) = arena[scope].table(ns) {
            for key in table.keys() {
                out.push(key.to_string());
            }
        }
    }
    out
}

/// Register a schema-tree child under its parent, enforcing the case-child
/// rule: sibling `case` bodies under the same `choice` must not declare the
/// same child name, unless the registration happens inside an `augment` body
/// (augmentation contents are validated against their target separately).
pub fn register_schema_tree_child(
    arena: &mut ContextArena,
    parent: CtxId,
    name: &str,
    child: CtxId,
    sref: StatementSourceRef,
) -> Result<(), BuildError> {
    if arena[parent].keyword == "case" && !in_augment_scope(arena, parent, child) {
        if let Some(choice) = arena[parent].parent {
            let siblings = arena.effective_substatements(choice);
            for sibling in siblings {
                if sibling == parent || arena[sibling].keyword != "case" {
                    continue;
                }
                let clash = arena[sibling]
                    .table(NamespaceId::SchemaTreeChild)
                    .and_then(|t| t.get(&NsKey::Name(name.to_string())))
                    .map(|e| e.sref.clone());
                if let Some(first) = clash {
                    return Err(BuildError::Collision {
                        name: name.to_string(),
                        first,
                        second: sref,
                    });
                }
            }
        }
    }
    let entry = NsEntry { value: NsValue::Ctx(child), sref };
    insert_checked(
        arena[parent].table_mut(NamespaceId::SchemaTreeChild),
        NsKey::Name(name.to_string()),
        entry,
    )
}

fn in_augment_scope(arena: &ContextArena, parent: CtxId, child: CtxId) -> bool {
    use crate::compiler::copy_history::CopyType;
    arena.has_ancestor_keyword(parent, "augment")
        || arena[parent].keyword == "augment"
        || arena[child].copy_history.contains(CopyType::AddedByAugmentation)
}

/// Stored (non-expanding) child lookup; the derived behaviour's fast path.
pub fn stored_child(arena: &ContextArena, parent: CtxId, name: &str) -> Option<CtxId> {
    arena[parent]
        .table(NamespaceId::SchemaTreeChild)
        .and_then(|t| t.get(&NsKey::Name(name.to_string())))
        .and_then(|e| e.value.as_ctx())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::IrStatement;
    use yangc_core::SourceIdentifier;

    fn arena_with(ir: IrStatement) -> (ContextArena, CtxId) {
        let mut arena = ContextArena::new();
        let root = arena.ingest(&ir, &SourceIdentifier::new("test"));
        (arena, root)
    }

    fn sref(arena: &ContextArena, id: CtxId) -> StatementSourceRef {
        arena[id].sref.clone()
    }

    #[test]
    fn test_global_put_get_and_collision() {
        let (mut arena, root) = arena_with(IrStatement::new("module", Some("a")));
        let mut storage = NamespaceStorage::new();
        let r = sref(&arena, root);

        put(
            &mut arena,
            &mut storage,
            root,
            NamespaceId::ModuleByName,
            NsKey::Name("a".into()),
            NsValue::Ctx(root),
            r.clone(),
        )
        .unwrap();

        let got = get(&arena, &storage, root, NamespaceId::ModuleByName, &NsKey::Name("a".into()));
        assert_eq!(got.and_then(|v| v.as_ctx()), Some(root));

        let err = put(
            &mut arena,
            &mut storage,
            root,
            NamespaceId::ModuleByName,
            NsKey::Name("a".into()),
            NsValue::Ctx(root),
            r,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Collision { .. }));
    }

    #[test]
    fn test_statement_local_inheritance() {
        let ir = IrStatement::new("module", Some("m"))
            .with(IrStatement::new("container", Some("c")).with(IrStatement::new("leaf", Some("x"))));
        let (mut arena, root) = arena_with(ir);
        let container = arena[root].declared[0];
        let leaf = arena[container].declared[0];
        let mut storage = NamespaceStorage::new();

        // Grouping registered at module scope is visible from the leaf.
        let r = sref(&arena, root);
        put(
            &mut arena,
            &mut storage,
            root,
            NamespaceId::Grouping,
            NsKey::Name("g".into()),
            NsValue::Ctx(root),
            r,
        )
        .unwrap();
        assert!(get(&arena, &storage, leaf, NamespaceId::Grouping, &NsKey::Name("g".into()))
            .is_some());

        // SchemaTreeChild does not inherit.
        let r = sref(&arena, container);
        put(
            &mut arena,
            &mut storage,
            container,
            NamespaceId::SchemaTreeChild,
            NsKey::Name("x".into()),
            NsValue::Ctx(leaf),
            r,
        )
        .unwrap();
        assert!(get(&arena, &storage, leaf, NamespaceId::SchemaTreeChild, &NsKey::Name("x".into()))
            .is_none());
        assert_eq!(stored_child(&arena, container, "x"), Some(leaf));
    }

    #[test]
    fn test_case_sibling_collision() {
        let ir = IrStatement::new("module", Some("m")).with(
            IrStatement::new("choice", Some("ch"))
                .with(IrStatement::new("case", Some("a")).with(IrStatement::new("leaf", Some("x"))))
                .with(IrStatement::new("case", Some("b")).with(IrStatement::new("leaf", Some("x")))),
        );
        let (mut arena, root) = arena_with(ir);
        let choice = arena[root].declared[0];
        let case_a = arena[choice].declared[0];
        let case_b = arena[choice].declared[1];
        let leaf_a = arena[case_a].declared[0];
        let leaf_b = arena[case_b].declared[0];

        let r = sref(&arena, leaf_a);
        register_schema_tree_child(&mut arena, case_a, "x", leaf_a, r).unwrap();
        let r = sref(&arena, leaf_b);
        let err = register_schema_tree_child(&mut arena, case_b, "x", leaf_b, r).unwrap_err();
        assert!(matches!(err, BuildError::Collision { .. }));
    }

    #[test]
    fn test_case_collision_allowed_under_augment() {
        let ir = IrStatement::new("module", Some("m")).with(
            IrStatement::new("augment", Some("/c")).with(
                IrStatement::new("choice", Some("ch"))
                    .with(
                        IrStatement::new("case", Some("a"))
                            .with(IrStatement::new("leaf", Some("x"))),
                    )
                    .with(
                        IrStatement::new("case", Some("b"))
                            .with(IrStatement::new("leaf", Some("x"))),
                    ),
            ),
        );
        let (mut arena, root) = arena_with(ir);
        let augment = arena[root].declared[0];
        let choice = arena[augment].declared[0];
        let case_a = arena[choice].declared[0];
        let case_b = arena[choice].declared[1];
        let leaf_a = arena[case_a].declared[0];
        let leaf_b = arena[case_b].declared[0];

        let r = sref(&arena, leaf_a);
        register_schema_tree_child(&mut arena, case_a, "x", leaf_a, r).unwrap();
        let r = sref(&arena, leaf_b);
        register_schema_tree_child(&mut arena, case_b, "x", leaf_b, r).unwrap();
    }
}
