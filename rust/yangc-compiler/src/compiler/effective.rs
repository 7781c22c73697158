//! Effective model assembly.
//!
//! Once every phase has completed, the mutable statement graph is frozen
//! into an immutable tree of [`EffectiveStatement`] nodes. Freezing is
//! memoized per context, so subtrees reachable more than once (submodule
//! bodies spliced into their owning module) are shared, not duplicated.
//!
//! Expanded `uses` and applied `augment` statements do not appear in the
//! effective tree; their injected copies stand in their place.

use crate::compiler::context::CtxId;
use crate::compiler::copy_history::{CopyHistory, CopyType};
use crate::compiler::namespace::{self, NamespaceId, NsKey};
use crate::compiler::reactor::Reactor;
use crate::compiler::support::Argument;
use crate::BuildError;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use yangc_core::{QName, QNameModule};

/// Statement keywords that form schema-tree (data) nodes.
const DATA_KEYWORDS: &[&str] = &[
    "container", "leaf", "leaf-list", "list", "choice", "case", "anyxml", "anydata",
];

/// One frozen statement in the effective model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveStatement {
    pub keyword: String,
    pub argument: Option<Argument>,
    /// Qualified name, for named schema-tree nodes and identities. Copies
    /// instantiated via `uses` take the namespace of the using module.
    pub qname: Option<QName>,
    pub copy_history: CopyHistory,
    pub substatements: Vec<Arc<EffectiveStatement>>,
}

impl EffectiveStatement {
    /// First substatement with the given keyword.
    pub fn find(&self, keyword: &str) -> Option<&Arc<EffectiveStatement>> {
        self.substatements.iter().find(|s| s.keyword == keyword)
    }

    /// All substatements with the given keyword, in declaration order.
    pub fn find_all<'a>(
        &'a self,
        keyword: &'a str,
    ) -> impl Iterator<Item = &'a Arc<EffectiveStatement>> {
        self.substatements.iter().filter(move |s| s.keyword == keyword)
    }

    /// The argument rendered as text, if present.
    pub fn argument_str(&self) -> Option<String> {
        match &self.argument {
            None | Some(Argument::None) => None,
            Some(Argument::Identifier(s)) | Some(Argument::Text(s)) | Some(Argument::Uri(s)) => {
                Some(s.clone())
            }
            Some(Argument::Revision(r)) => Some(r.to_string()),
            Some(Argument::NodeName(n)) => Some(n.to_string()),
            Some(Argument::SchemaNodeId(p)) => Some(p.to_string()),
            Some(Argument::Boolean(b)) => Some(b.to_string()),
        }
    }

    fn child_data_node(&self, name: &str) -> Option<&Arc<EffectiveStatement>> {
        self.substatements.iter().find(|s| {
            DATA_KEYWORDS.contains(&s.keyword.as_str())
                && s.qname.as_ref().is_some_and(|q| q.local_name() == name)
        })
    }
}

/// The immutable result of a successful build.
#[derive(Debug)]
pub struct EffectiveModelContext {
    modules: BTreeMap<QNameModule, Arc<EffectiveStatement>>,
    modules_by_name: BTreeMap<String, QNameModule>,
    // Reverse prefix indices, computed once at assembly.
    prefix_to_module: BTreeMap<String, QNameModule>,
    module_to_prefix: BTreeMap<QNameModule, String>,
}

impl EffectiveModelContext {
    pub fn modules(&self) -> impl Iterator<Item = (&QNameModule, &Arc<EffectiveStatement>)> {
        self.modules.iter()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn find_module(&self, module: &QNameModule) -> Option<&Arc<EffectiveStatement>> {
        self.modules.get(module)
    }

    pub fn find_module_by_name(&self, name: &str) -> Option<&Arc<EffectiveStatement>> {
        self.modules_by_name.get(name).and_then(|qnm| self.modules.get(qnm))
    }

    pub fn find_module_by_prefix(&self, prefix: &str) -> Option<&Arc<EffectiveStatement>> {
        self.prefix_to_module.get(prefix).and_then(|qnm| self.modules.get(qnm))
    }

    /// The prefix a module declared for itself.
    pub fn preferred_prefix(&self, module: &QNameModule) -> Option<&str> {
        self.module_to_prefix.get(module).map(String::as_str)
    }

    /// Walk a path of data-node names down one module's schema tree.
    pub fn find_schema_node(
        &self,
        module_name: &str,
        path: &[&str],
    ) -> Option<&Arc<EffectiveStatement>> {
        let mut cursor = self.find_module_by_name(module_name)?;
        for step in path {
            cursor = cursor.child_data_node(step)?;
        }
        Some(cursor)
    }

    /// Serialize all modules as a JSON document keyed by module identity.
    pub fn export_json(&self) -> serde_json::Result<String> {
        let doc: Vec<serde_json::Value> = self
            .modules
            .iter()
            .map(|(qnm, stmt)| {
                Ok(serde_json::json!({
                    "module": qnm.to_string(),
                    "statement": serde_json::to_value(stmt.as_ref())?,
                }))
            })
            .collect::<serde_json::Result<_>>()?;
        serde_json::to_string_pretty(&doc)
    }
}

/// Freeze the converged statement graph into the effective model.
pub fn assemble(build: &mut Reactor) -> Result<EffectiveModelContext, BuildError> {
    let mut cache: HashMap<CtxId, Arc<EffectiveStatement>> = HashMap::new();
    let mut modules = BTreeMap::new();
    let mut modules_by_name = BTreeMap::new();
    let mut prefix_to_module = BTreeMap::new();
    let mut module_to_prefix = BTreeMap::new();

    let roots: Vec<CtxId> = build
        .sources
        .iter()
        .map(|s| s.root)
        .filter(|r| build.arena[*r].keyword == "module")
        .collect();

    for root in roots {
        let name = match build.arena[root].argument.clone() {
            Some(Argument::Identifier(name)) => name,
            _ => continue,
        };
        let qnm = namespace::get(
            &build.arena,
            &build.globals,
            root,
            NamespaceId::ModuleToQNameModule,
            &NsKey::Ctx(root),
        )
        .and_then(|v| v.as_module().cloned())
        .ok_or_else(|| BuildError::Syntax {
            message: format!("module '{}' has no namespace mapping", name),
            sref: build.arena[root].sref.clone(),
        })?;

        let mut children = Vec::new();
        collect_body(build, root, &qnm, &mut cache, &mut children);

        // Included submodule bodies become part of the owning module; the
        // linkage header that stitched them in does not.
        let subs: Vec<CtxId> = build.arena[root]
            .table(NamespaceId::IncludedSubmodule)
            .map(|t| t.values().filter_map(|e| e.value.as_ctx()).collect())
            .unwrap_or_default();
        for sub in subs {
            collect_submodule_body(build, sub, &qnm, &mut cache, &mut children);
        }

        let qname = QName::new(qnm.clone(), &name).map_err(|e| BuildError::Syntax {
            message: e.to_string(),
            sref: build.arena[root].sref.clone(),
        })?;
        let stmt = Arc::new(build.registry().get("module").build_effective(
            "module",
            build.arena[root].argument.clone(),
            Some(qname),
            build.arena[root].copy_history,
            children,
        ));

        if let Some(prefix) = stmt.find("prefix").and_then(|p| p.argument_str()) {
            prefix_to_module.entry(prefix.clone()).or_insert_with(|| qnm.clone());
            module_to_prefix.insert(qnm.clone(), prefix);
        }
        modules_by_name.insert(name, qnm.clone());
        modules.insert(qnm, stmt);
    }

    debug!(
        "effective model assembled: {} module(s) from {} source(s)",
        modules.len(),
        build.sources.len()
    );
    Ok(EffectiveModelContext { modules, modules_by_name, prefix_to_module, module_to_prefix })
}

fn collect_body(
    build: &Reactor,
    root: CtxId,
    qnm: &QNameModule,
    cache: &mut HashMap<CtxId, Arc<EffectiveStatement>>,
    out: &mut Vec<Arc<EffectiveStatement>>,
) {
    for child in build.arena.effective_substatements(root) {
        if skip_in_effective(build, child) {
            continue;
        }
        out.push(freeze(build, child, qnm, cache));
    }
}

fn collect_submodule_body(
    build: &Reactor,
    sub: CtxId,
    qnm: &QNameModule,
    cache: &mut HashMap<CtxId, Arc<EffectiveStatement>>,
    out: &mut Vec<Arc<EffectiveStatement>>,
) {
    for child in build.arena.effective_substatements(sub) {
        if build.arena[child].keyword == "belongs-to" || skip_in_effective(build, child) {
            continue;
        }
        out.push(freeze(build, child, qnm, cache));
    }
}

/// Expanded `uses` and applied `augment` statements are resolution
/// machinery; their injected output replaces them.
fn skip_in_effective(build: &Reactor, id: CtxId) -> bool {
    let node = &build.arena[id];
    (node.keyword == "uses" || node.keyword == "augment") && node.expanded
}

fn declaring_module(build: &Reactor, id: CtxId) -> Option<QNameModule> {
    let origin = build.arena.origin(id);
    let root = build.arena.root_of(origin);
    namespace::get(
        &build.arena,
        &build.globals,
        root,
        NamespaceId::ModuleToQNameModule,
        &NsKey::Ctx(root),
    )
    .and_then(|v| v.as_module().cloned())
}

fn freeze(
    build: &Reactor,
    id: CtxId,
    qnm: &QNameModule,
    cache: &mut HashMap<CtxId, Arc<EffectiveStatement>>,
) -> Arc<EffectiveStatement> {
    if let Some(hit) = cache.get(&id) {
        return hit.clone();
    }
    let mut substatements = Vec::new();
    for child in build.arena.effective_substatements(id) {
        if skip_in_effective(build, child) {
            continue;
        }
        substatements.push(freeze(build, child, qnm, cache));
    }

    let node = &build.arena[id];
    let qname = match &node.argument {
        Some(Argument::Identifier(name))
            if DATA_KEYWORDS.contains(&node.keyword.as_str()) || node.keyword == "identity" =>
        {
            // Augment-spliced nodes keep the augmenting module's namespace;
            // uses-instantiated nodes take the using module's.
            let owner = if node.copy_history.contains(CopyType::AddedByAugmentation) {
                declaring_module(build, id).unwrap_or_else(|| qnm.clone())
            } else {
                qnm.clone()
            };
            QName::new(owner, name).ok()
        }
        _ => None,
    };
    let stmt = Arc::new(build.registry().get(&node.keyword).build_effective(
        &node.keyword,
        node.argument.clone(),
        qname,
        node.copy_history,
        substatements,
    ));
    cache.insert(id, stmt.clone());
    stmt
}
