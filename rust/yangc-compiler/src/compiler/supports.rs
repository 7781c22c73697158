//! Concrete statement supports and their inference actions.
//!
//! The registry built by [`default_registry`] covers the header/linkage
//! statements (`module`, `submodule`, `namespace`, `prefix`, `revision`,
//! `belongs-to`, `import`, `include`), the schema-tree statements
//! (`container`, `leaf`, `leaf-list`, `list`, `choice`, `case`), the
//! reusable-block machinery (`grouping`, `uses`, `augment`), leafref
//! `path` resolution and the identity/typedef statements. Everything else
//! falls through to the extension support, which accepts any argument and
//! has no grammar.

use crate::compiler::context::CtxId;
use crate::compiler::copy_history::{CopyHistory, CopyType};
use crate::compiler::namespace::{
    self, NamespaceId, NamespaceStorage, NsKey, NsValue, register_schema_tree_child,
};
use crate::compiler::reactor::{ApplyResult, InferenceAction, Modifier, Reactor};
use crate::compiler::support::{
    parse_identifier_argument, parse_text_argument, Argument, Cardinality, GrammarRow, NodeName,
    SchemaNodeId, StatementSupport, SupportRegistry,
};
use crate::BuildError;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use yangc_core::{QName, QNameModule, Revision, StatementSourceRef, XmlNamespace};

// ── Argument shapes ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgKind {
    None,
    Identifier,
    Text,
    Uri,
    Revision,
    NodeName,
    SchemaNodeId,
    Boolean,
    Status,
}

fn parse_arg(
    kind: ArgKind,
    keyword: &str,
    raw: Option<&str>,
    sref: &StatementSourceRef,
) -> Result<Argument, BuildError> {
    let syntax = |message: String| BuildError::Syntax { message, sref: sref.clone() };
    let required = || syntax(format!("'{}' statement requires an argument", keyword));

    match kind {
        ArgKind::None => match raw {
            None => Ok(Argument::None),
            Some(s) => Err(syntax(format!("'{}' statement takes no argument, found '{}'", keyword, s))),
        },
        ArgKind::Identifier => parse_identifier_argument(keyword, raw, sref),
        ArgKind::Text => parse_text_argument(keyword, raw, sref),
        ArgKind::Uri => match raw {
            Some(s) if !s.trim().is_empty() => Ok(Argument::Uri(s.to_string())),
            Some(_) => Err(syntax(format!("'{}' argument must be a non-empty URI", keyword))),
            None => Err(required()),
        },
        ArgKind::Revision => match raw {
            Some(s) => s
                .parse::<Revision>()
                .map(Argument::Revision)
                .map_err(|e| syntax(format!("'{}': {}", keyword, e))),
            None => Err(required()),
        },
        ArgKind::NodeName => match raw {
            Some(s) => NodeName::parse(s).map(Argument::NodeName).ok_or_else(|| {
                syntax(format!("'{}' argument '{}' is not a valid node name", keyword, s))
            }),
            None => Err(required()),
        },
        ArgKind::SchemaNodeId => match raw {
            Some(s) => SchemaNodeId::parse(s).map(Argument::SchemaNodeId).ok_or_else(|| {
                syntax(format!(
                    "'{}' argument '{}' is not a valid schema node identifier",
                    keyword, s
                ))
            }),
            None => Err(required()),
        },
        ArgKind::Boolean => match raw {
            Some("true") => Ok(Argument::Boolean(true)),
            Some("false") => Ok(Argument::Boolean(false)),
            Some(s) => Err(syntax(format!("'{}' argument must be 'true' or 'false', found '{}'", keyword, s))),
            None => Err(required()),
        },
        ArgKind::Status => match raw {
            Some(s @ ("current" | "deprecated" | "obsolete")) => {
                Ok(Argument::Identifier(s.to_string()))
            }
            Some(s) => Err(syntax(format!("'status' argument '{}' is not one of current/deprecated/obsolete", s))),
            None => Err(required()),
        },
    }
}

// ── Grammar tables ──────────────────────────────────────────────────

const MODULE_GRAMMAR: &[GrammarRow] = &[
    ("namespace", Cardinality::Mandatory),
    ("prefix", Cardinality::Mandatory),
    ("yang-version", Cardinality::Optional),
    ("organization", Cardinality::Optional),
    ("contact", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const SUBMODULE_GRAMMAR: &[GrammarRow] = &[
    ("belongs-to", Cardinality::Mandatory),
    ("yang-version", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const IMPORT_GRAMMAR: &[GrammarRow] = &[
    ("prefix", Cardinality::Mandatory),
    ("revision-date", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const INCLUDE_GRAMMAR: &[GrammarRow] = &[("revision-date", Cardinality::Optional)];

const BELONGS_TO_GRAMMAR: &[GrammarRow] = &[("prefix", Cardinality::Mandatory)];

const LEAF_GRAMMAR: &[GrammarRow] = &[
    ("type", Cardinality::Mandatory),
    ("units", Cardinality::Optional),
    ("default", Cardinality::Optional),
    ("config", Cardinality::Optional),
    ("mandatory", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const LEAF_LIST_GRAMMAR: &[GrammarRow] = &[
    ("type", Cardinality::Mandatory),
    ("units", Cardinality::Optional),
    ("config", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const LIST_GRAMMAR: &[GrammarRow] = &[
    ("key", Cardinality::Optional),
    ("config", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const CONTAINER_GRAMMAR: &[GrammarRow] = &[
    ("presence", Cardinality::Optional),
    ("config", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const CHOICE_GRAMMAR: &[GrammarRow] = &[
    ("default", Cardinality::Optional),
    ("mandatory", Cardinality::Optional),
    ("config", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const CASE_GRAMMAR: &[GrammarRow] = &[
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const GROUPING_GRAMMAR: &[GrammarRow] = &[
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const USES_GRAMMAR: &[GrammarRow] = &[
    ("when", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const AUGMENT_GRAMMAR: &[GrammarRow] = &[
    ("when", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const TYPEDEF_GRAMMAR: &[GrammarRow] = &[
    ("type", Cardinality::Mandatory),
    ("units", Cardinality::Optional),
    ("default", Cardinality::Optional),
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const IDENTITY_GRAMMAR: &[GrammarRow] = &[
    ("status", Cardinality::Optional),
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

const TYPE_GRAMMAR: &[GrammarRow] = &[("path", Cardinality::Optional)];

const REVISION_GRAMMAR: &[GrammarRow] = &[
    ("description", Cardinality::Optional),
    ("reference", Cardinality::Optional),
];

// ── Table-driven supports ───────────────────────────────────────────

/// Support for statement kinds that need no phase hooks: argument shape,
/// grammar, and registration properties are all data.
struct SimpleSupport {
    keyword: &'static str,
    arg: ArgKind,
    grammar: &'static [GrammarRow],
    data_node: bool,
    symbol_ns: Option<NamespaceId>,
}

impl StatementSupport for SimpleSupport {
    fn keyword(&self) -> &'static str {
        self.keyword
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_arg(self.arg, self.keyword, raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        self.grammar
    }

    fn is_data_node(&self) -> bool {
        self.data_node
    }

    fn symbol_namespace(&self) -> Option<NamespaceId> {
        self.symbol_ns
    }
}

/// Fallback for keywords the registry does not know: extension statements
/// pass through the reactor untouched.
struct ExtensionSupport;

impl StatementSupport for ExtensionSupport {
    fn keyword(&self) -> &'static str {
        "(extension)"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        _sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        Ok(match raw {
            Some(s) => Argument::Text(s.to_string()),
            None => Argument::None,
        })
    }
}

// ── Module / submodule ──────────────────────────────────────────────

struct ModuleSupport;

impl StatementSupport for ModuleSupport {
    fn keyword(&self) -> &'static str {
        "module"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_identifier_argument("module", raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        MODULE_GRAMMAR
    }

    /// Register this module's namespace URI, prefix and revision into the
    /// global namespaces. Only headers are inspected here.
    fn on_pre_linkage(&self, build: &mut Reactor, ctx: CtxId) -> Result<(), BuildError> {
        if build.arena[ctx].parent.is_some() {
            return Err(BuildError::Syntax {
                message: "'module' is only valid as a root statement".to_string(),
                sref: build.arena[ctx].sref.clone(),
            });
        }

        let sref = build.arena[ctx].sref.clone();
        let uri = match parse_header_child(build, ctx, "namespace", ArgKind::Uri)? {
            Some(Argument::Uri(uri)) => uri,
            _ => {
                return Err(BuildError::Cardinality {
                    message: "'module' statement is missing its mandatory 'namespace' substatement"
                        .to_string(),
                    sref,
                })
            }
        };
        let prefix = match parse_header_child(build, ctx, "prefix", ArgKind::Identifier)? {
            Some(Argument::Identifier(p)) => p,
            _ => {
                return Err(BuildError::Cardinality {
                    message: "'module' statement is missing its mandatory 'prefix' substatement"
                        .to_string(),
                    sref,
                })
            }
        };
        let revision = latest_revision(build, ctx)?;

        let qnm = QNameModule::new(XmlNamespace::of(&uri), revision);

        // Two modules claiming the same namespace is a linkage-level error,
        // reported with both source references.
        match namespace::put(
            &mut build.arena,
            &mut build.globals,
            ctx,
            NamespaceId::ModuleNamespace,
            NsKey::Namespace(qnm.namespace.clone()),
            NsValue::Ctx(ctx),
            sref.clone(),
        ) {
            Err(BuildError::Collision { first, second, .. }) => {
                return Err(BuildError::DuplicateNamespace { namespace: uri, first, second });
            }
            other => other?,
        }

        namespace::put(
            &mut build.arena,
            &mut build.globals,
            ctx,
            NamespaceId::ModuleToQNameModule,
            NsKey::Ctx(ctx),
            NsValue::Module(qnm.clone()),
            sref.clone(),
        )?;
        namespace::put(
            &mut build.arena,
            &mut build.globals,
            ctx,
            NamespaceId::PrefixToModule,
            NsKey::Prefix(prefix),
            NsValue::Module(qnm),
            sref,
        )?;
        Ok(())
    }
}

struct SubmoduleSupport;

impl StatementSupport for SubmoduleSupport {
    fn keyword(&self) -> &'static str {
        "submodule"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_identifier_argument("submodule", raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        SUBMODULE_GRAMMAR
    }

    /// Parse the `belongs-to` header so include resolution can check it.
    fn on_pre_linkage(&self, build: &mut Reactor, ctx: CtxId) -> Result<(), BuildError> {
        if build.arena[ctx].parent.is_some() {
            return Err(BuildError::Syntax {
                message: "'submodule' is only valid as a root statement".to_string(),
                sref: build.arena[ctx].sref.clone(),
            });
        }
        let sref = build.arena[ctx].sref.clone();
        if parse_header_child(build, ctx, "belongs-to", ArgKind::Identifier)?.is_none() {
            return Err(BuildError::Cardinality {
                message: "'submodule' statement is missing its mandatory 'belongs-to' substatement"
                    .to_string(),
                sref,
            });
        }
        latest_revision(build, ctx)?;
        Ok(())
    }
}

/// Parse the argument of the first declared child with `keyword` and return
/// it, caching the parsed form on the child context.
fn parse_header_child(
    build: &mut Reactor,
    ctx: CtxId,
    keyword: &str,
    kind: ArgKind,
) -> Result<Option<Argument>, BuildError> {
    let child = build.arena[ctx]
        .declared
        .iter()
        .copied()
        .find(|c| build.arena[*c].keyword == keyword);
    let Some(child) = child else {
        return Ok(None);
    };
    if let Some(parsed) = build.arena[child].argument.clone() {
        return Ok(Some(parsed));
    }
    let raw = build.arena[child].raw_argument.clone();
    let sref = build.arena[child].sref.clone();
    let parsed = parse_arg(kind, keyword, raw.as_deref(), &sref)?;
    build.arena[child].argument = Some(parsed.clone());
    Ok(Some(parsed))
}

/// Parse all `revision` children of a root and return the newest date.
fn latest_revision(build: &mut Reactor, root: CtxId) -> Result<Option<Revision>, BuildError> {
    let children: Vec<CtxId> = build.arena[root]
        .declared
        .iter()
        .copied()
        .filter(|c| build.arena[*c].keyword == "revision")
        .collect();
    let mut latest: Option<Revision> = None;
    for child in children {
        let raw = build.arena[child].raw_argument.clone();
        let sref = build.arena[child].sref.clone();
        let parsed = parse_arg(ArgKind::Revision, "revision", raw.as_deref(), &sref)?;
        if let Argument::Revision(rev) = &parsed {
            if latest.map_or(true, |l| l < *rev) {
                latest = Some(*rev);
            }
        }
        build.arena[child].argument = Some(parsed);
    }
    Ok(latest)
}

// ── Import / include ────────────────────────────────────────────────

struct ImportSupport;

impl StatementSupport for ImportSupport {
    fn keyword(&self) -> &'static str {
        "import"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_identifier_argument("import", raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        IMPORT_GRAMMAR
    }

    fn on_linkage(&self, build: &mut Reactor, ctx: CtxId) -> Result<Option<Modifier>, BuildError> {
        let sref = build.arena[ctx].sref.clone();
        let raw = build.arena[ctx].raw_argument.clone();
        let module = match parse_arg(ArgKind::Identifier, "import", raw.as_deref(), &sref)? {
            Argument::Identifier(name) => name,
            _ => unreachable!(),
        };
        build.arena[ctx].argument = Some(Argument::Identifier(module.clone()));

        let prefix = match parse_header_child(build, ctx, "prefix", ArgKind::Identifier)? {
            Some(Argument::Identifier(p)) => p,
            _ => {
                return Err(BuildError::Cardinality {
                    message: format!(
                        "'import {}' is missing its mandatory 'prefix' substatement",
                        module
                    ),
                    sref,
                })
            }
        };
        let revision = match parse_header_child(build, ctx, "revision-date", ArgKind::Revision)? {
            Some(Argument::Revision(rev)) => Some(rev),
            _ => None,
        };

        Ok(Some(Modifier {
            ctx,
            action: InferenceAction::ResolveImport { module, revision, prefix },
        }))
    }
}

struct IncludeSupport;

impl StatementSupport for IncludeSupport {
    fn keyword(&self) -> &'static str {
        "include"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_identifier_argument("include", raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        INCLUDE_GRAMMAR
    }

    fn on_linkage(&self, build: &mut Reactor, ctx: CtxId) -> Result<Option<Modifier>, BuildError> {
        let sref = build.arena[ctx].sref.clone();
        let raw = build.arena[ctx].raw_argument.clone();
        let submodule = match parse_arg(ArgKind::Identifier, "include", raw.as_deref(), &sref)? {
            Argument::Identifier(name) => name,
            _ => unreachable!(),
        };
        build.arena[ctx].argument = Some(Argument::Identifier(submodule.clone()));
        Ok(Some(Modifier { ctx, action: InferenceAction::ResolveInclude { submodule } }))
    }
}

// ── Uses / augment / base ───────────────────────────────────────────

struct UsesSupport;

impl StatementSupport for UsesSupport {
    fn keyword(&self) -> &'static str {
        "uses"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_arg(ArgKind::NodeName, "uses", raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        USES_GRAMMAR
    }

    fn on_full_declaration(
        &self,
        build: &mut Reactor,
        ctx: CtxId,
    ) -> Result<Option<Modifier>, BuildError> {
        // Uses inside a grouping definition are expanded when the grouping
        // is instantiated, not where they are declared.
        if build.arena.has_ancestor_keyword(ctx, "grouping") {
            return Ok(None);
        }
        let target = match build.arena[ctx].argument.clone() {
            Some(Argument::NodeName(target)) => target,
            _ => unreachable!("uses argument parsed during STATEMENT_DEFINITION"),
        };
        Ok(Some(Modifier { ctx, action: InferenceAction::ExpandUses { target } }))
    }
}

struct AugmentSupport;

impl StatementSupport for AugmentSupport {
    fn keyword(&self) -> &'static str {
        "augment"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_arg(ArgKind::SchemaNodeId, "augment", raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        AUGMENT_GRAMMAR
    }

    fn on_full_declaration(
        &self,
        build: &mut Reactor,
        ctx: CtxId,
    ) -> Result<Option<Modifier>, BuildError> {
        if build.arena.has_ancestor_keyword(ctx, "grouping") {
            return Ok(None);
        }
        let parent = build.arena[ctx].parent;
        let parent_keyword = parent.map(|p| build.arena[p].keyword.clone());
        let path = match build.arena[ctx].argument.clone() {
            Some(Argument::SchemaNodeId(path)) => path,
            _ => unreachable!("augment argument parsed during STATEMENT_DEFINITION"),
        };

        match parent_keyword.as_deref() {
            Some("module") | Some("submodule") => {
                if !path.absolute {
                    return Err(BuildError::Syntax {
                        message: format!(
                            "top-level 'augment {}' requires an absolute schema node identifier",
                            path
                        ),
                        sref: build.arena[ctx].sref.clone(),
                    });
                }
                Ok(Some(Modifier { ctx, action: InferenceAction::ApplyAugment { path } }))
            }
            Some("uses") => {
                if path.absolute {
                    return Err(BuildError::Syntax {
                        message: format!(
                            "'augment {}' under 'uses' requires a relative schema node identifier",
                            path
                        ),
                        sref: build.arena[ctx].sref.clone(),
                    });
                }
                Ok(Some(Modifier { ctx, action: InferenceAction::ApplyAugment { path } }))
            }
            _ => Err(BuildError::Syntax {
                message: "'augment' is only valid under 'module', 'submodule' or 'uses'"
                    .to_string(),
                sref: build.arena[ctx].sref.clone(),
            }),
        }
    }
}

struct BaseSupport;

impl StatementSupport for BaseSupport {
    fn keyword(&self) -> &'static str {
        "base"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_arg(ArgKind::NodeName, "base", raw, sref)
    }

    fn on_full_declaration(
        &self,
        build: &mut Reactor,
        ctx: CtxId,
    ) -> Result<Option<Modifier>, BuildError> {
        // Only `base` under `identity` resolves against the identity
        // namespace; `base` under `type identityref` is carried opaquely.
        let under_identity = build.arena[ctx]
            .parent
            .is_some_and(|p| build.arena[p].keyword == "identity");
        if !under_identity {
            return Ok(None);
        }
        let base = match build.arena[ctx].argument.clone() {
            Some(Argument::NodeName(base)) => base,
            _ => unreachable!("base argument parsed during STATEMENT_DEFINITION"),
        };
        Ok(Some(Modifier { ctx, action: InferenceAction::ResolveBase { base } }))
    }
}

// ── Type / leafref path ─────────────────────────────────────────────

struct TypeSupport;

impl StatementSupport for TypeSupport {
    fn keyword(&self) -> &'static str {
        "type"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_arg(ArgKind::NodeName, "type", raw, sref)
    }

    fn substatement_grammar(&self) -> &'static [GrammarRow] {
        TYPE_GRAMMAR
    }

    /// `type leafref` requires a `path`; the path statement itself queues
    /// the resolution.
    fn on_full_declaration(
        &self,
        build: &mut Reactor,
        ctx: CtxId,
    ) -> Result<Option<Modifier>, BuildError> {
        if !is_leafref_type(build, ctx) {
            return Ok(None);
        }
        let has_path = build.arena[ctx]
            .declared
            .iter()
            .any(|c| build.arena[*c].keyword == "path");
        if !has_path {
            return Err(BuildError::Cardinality {
                message: "'type leafref' requires a 'path' substatement".to_string(),
                sref: build.arena[ctx].sref.clone(),
            });
        }
        Ok(None)
    }
}

struct PathSupport;

impl StatementSupport for PathSupport {
    fn keyword(&self) -> &'static str {
        "path"
    }

    fn parse_argument(
        &self,
        raw: Option<&str>,
        sref: &StatementSourceRef,
    ) -> Result<Argument, BuildError> {
        parse_text_argument("path", raw, sref)
    }

    fn on_full_declaration(
        &self,
        build: &mut Reactor,
        ctx: CtxId,
    ) -> Result<Option<Modifier>, BuildError> {
        // Paths inside grouping bodies resolve where the grouping is
        // instantiated; paths inside augment bodies resolve where the body
        // is spliced. Both get queued for their copies instead.
        if build.arena.has_ancestor_keyword(ctx, "grouping")
            || build.arena.has_ancestor_keyword(ctx, "augment")
        {
            return Ok(None);
        }
        leafref_modifier(build, ctx)
    }
}

fn is_leafref_type(build: &Reactor, type_ctx: CtxId) -> bool {
    matches!(
        &build.arena[type_ctx].argument,
        Some(Argument::NodeName(n)) if n.prefix.is_none() && n.name == "leafref"
    )
}

/// Queue leafref resolution for a `path` statement sitting under
/// `type leafref`. Paths under other types are carried opaquely.
fn leafref_modifier(build: &Reactor, ctx: CtxId) -> Result<Option<Modifier>, BuildError> {
    let under_leafref = build.arena[ctx]
        .parent
        .is_some_and(|p| build.arena[p].keyword == "type" && is_leafref_type(build, p));
    if !under_leafref {
        return Ok(None);
    }
    let raw = match &build.arena[ctx].argument {
        Some(Argument::Text(s)) => s.clone(),
        _ => match &build.arena[ctx].raw_argument {
            Some(s) => s.clone(),
            None => return Ok(None),
        },
    };
    let sref = build.arena[ctx].sref.clone();
    let (up, path) = parse_leafref_path(&raw, &sref)?;
    Ok(Some(Modifier { ctx, action: InferenceAction::ResolveLeafref { up, path } }))
}

/// Parse a leafref path expression: absolute (`/a/b`) or relative with
/// leading `../` steps (`../../a/b`). Predicates and `deref()` are not
/// supported.
fn parse_leafref_path(
    raw: &str,
    sref: &StatementSourceRef,
) -> Result<(usize, SchemaNodeId), BuildError> {
    let syntax = |message: String| BuildError::Syntax { message, sref: sref.clone() };

    let mut rest = raw.trim();
    let mut up = 0usize;
    while let Some(r) = rest.strip_prefix("../") {
        up += 1;
        rest = r;
    }
    if up > 0 && rest.starts_with('/') {
        return Err(syntax(format!("leafref path '{}' mixes '../' with an absolute path", raw)));
    }
    let path = SchemaNodeId::parse(rest)
        .ok_or_else(|| syntax(format!("'{}' is not a valid leafref path", raw)))?;
    if up == 0 && !path.absolute {
        return Err(syntax(format!(
            "leafref path '{}' must be absolute or start with '../'",
            raw
        )));
    }
    Ok((up, path))
}

// ── Registry assembly ───────────────────────────────────────────────

/// The default statement support bundle.
pub fn default_registry() -> SupportRegistry {
    let mut registry = SupportRegistry::new(Arc::new(ExtensionSupport));

    registry.register(Arc::new(ModuleSupport));
    registry.register(Arc::new(SubmoduleSupport));
    registry.register(Arc::new(ImportSupport));
    registry.register(Arc::new(IncludeSupport));
    registry.register(Arc::new(UsesSupport));
    registry.register(Arc::new(AugmentSupport));
    registry.register(Arc::new(BaseSupport));
    registry.register(Arc::new(TypeSupport));
    registry.register(Arc::new(PathSupport));

    let simple = [
        SimpleSupport { keyword: "namespace", arg: ArgKind::Uri, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "prefix", arg: ArgKind::Identifier, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "yang-version", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "belongs-to", arg: ArgKind::Identifier, grammar: BELONGS_TO_GRAMMAR, data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "revision", arg: ArgKind::Revision, grammar: REVISION_GRAMMAR, data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "revision-date", arg: ArgKind::Revision, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "organization", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "contact", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "description", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "reference", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "container", arg: ArgKind::Identifier, grammar: CONTAINER_GRAMMAR, data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "leaf", arg: ArgKind::Identifier, grammar: LEAF_GRAMMAR, data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "leaf-list", arg: ArgKind::Identifier, grammar: LEAF_LIST_GRAMMAR, data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "list", arg: ArgKind::Identifier, grammar: LIST_GRAMMAR, data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "choice", arg: ArgKind::Identifier, grammar: CHOICE_GRAMMAR, data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "case", arg: ArgKind::Identifier, grammar: CASE_GRAMMAR, data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "anyxml", arg: ArgKind::Identifier, grammar: &[], data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "anydata", arg: ArgKind::Identifier, grammar: &[], data_node: true, symbol_ns: None },
        SimpleSupport { keyword: "grouping", arg: ArgKind::Identifier, grammar: GROUPING_GRAMMAR, data_node: false, symbol_ns: Some(NamespaceId::Grouping) },
        SimpleSupport { keyword: "typedef", arg: ArgKind::Identifier, grammar: TYPEDEF_GRAMMAR, data_node: false, symbol_ns: Some(NamespaceId::Typedef) },
        SimpleSupport { keyword: "identity", arg: ArgKind::Identifier, grammar: IDENTITY_GRAMMAR, data_node: false, symbol_ns: Some(NamespaceId::Identity) },
        SimpleSupport { keyword: "units", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "default", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "presence", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "key", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "config", arg: ArgKind::Boolean, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "mandatory", arg: ArgKind::Boolean, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "status", arg: ArgKind::Status, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "must", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        SimpleSupport { keyword: "when", arg: ArgKind::Text, grammar: &[], data_node: false, symbol_ns: None },
        // Registered so models carrying deviations parse; no rewriting is
        // performed.
        SimpleSupport { keyword: "deviation", arg: ArgKind::SchemaNodeId, grammar: &[], data_node: false, symbol_ns: None },
    ];
    for support in simple {
        registry.register(Arc::new(support));
    }
    registry
}

// ── Symbol registration (STATEMENT_DEFINITION) ──────────────────────

/// Register one context into the symbol namespaces its support declares:
/// schema-tree children under their parent, groupings/typedefs into their
/// enclosing scope, identities into the global identity namespace.
pub fn register_symbols(build: &mut Reactor, ctx: CtxId) -> Result<(), BuildError> {
    let registry = build.registry();
    let keyword = build.arena[ctx].keyword.clone();
    let support = registry.get(&keyword);
    let Some(parent) = build.arena[ctx].parent else {
        return Ok(());
    };

    let name = match build.arena[ctx].argument.clone() {
        Some(Argument::Identifier(name)) => name,
        _ => return Ok(()),
    };

    if support.is_data_node() {
        let sref = build.arena[ctx].sref.clone();
        register_schema_tree_child(&mut build.arena, parent, &name, ctx, sref)?;
    }

    match support.symbol_namespace() {
        Some(ns @ (NamespaceId::Grouping | NamespaceId::Typedef)) => {
            let sref = build.arena[ctx].sref.clone();
            namespace::put(
                &mut build.arena,
                &mut build.globals,
                parent,
                ns,
                NsKey::Name(name),
                NsValue::Ctx(ctx),
                sref,
            )?;
        }
        Some(NamespaceId::Identity) => {
            // The identity's QName uses the declaring module's namespace;
            // submodule identities belong to their parent module, linked
            // during include resolution.
            let root = build.arena.root_of(ctx);
            if let Some(qnm) = qname_module_of(build, root) {
                let sref = build.arena[ctx].sref.clone();
                let qname = QName::new(qnm, &name).map_err(|e| BuildError::Syntax {
                    message: e.to_string(),
                    sref: sref.clone(),
                })?;
                namespace::put(
                    &mut build.arena,
                    &mut build.globals,
                    ctx,
                    NamespaceId::Identity,
                    NsKey::QName(qname),
                    NsValue::Ctx(ctx),
                    sref,
                )?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn qname_module_of(build: &Reactor, root: CtxId) -> Option<QNameModule> {
    namespace::get(
        &build.arena,
        &build.globals,
        root,
        NamespaceId::ModuleToQNameModule,
        &NsKey::Ctx(root),
    )
    .and_then(|v| v.as_module().cloned())
}

// ── Modifier application (deferred inference) ───────────────────────

/// Attempt one deferred action. `NotReady` means the prerequisite is not in
/// place yet; the reactor retries until the phase reaches a fixed point.
pub fn try_apply_modifier(
    build: &mut Reactor,
    modifier: &Modifier,
) -> Result<ApplyResult, BuildError> {
    match &modifier.action {
        InferenceAction::ResolveImport { module, revision, prefix } => {
            resolve_import(build, modifier.ctx, module, *revision, prefix)
        }
        InferenceAction::ResolveInclude { submodule } => {
            resolve_include(build, modifier.ctx, submodule)
        }
        InferenceAction::ExpandUses { target } => expand_uses(build, modifier.ctx, target),
        InferenceAction::ApplyAugment { path } => apply_augment(build, modifier.ctx, path),
        InferenceAction::ResolveBase { base } => resolve_base(build, modifier.ctx, base),
        InferenceAction::ResolveLeafref { up, path } => {
            resolve_leafref(build, modifier.ctx, *up, path)
        }
    }
}

fn resolve_import(
    build: &mut Reactor,
    ctx: CtxId,
    module: &str,
    revision: Option<Revision>,
    prefix: &str,
) -> Result<ApplyResult, BuildError> {
    let Some(target) = namespace::get(
        &build.arena,
        &build.globals,
        ctx,
        NamespaceId::ModuleByName,
        &NsKey::Name(module.to_string()),
    )
    .and_then(|v| v.as_ctx()) else {
        return Ok(ApplyResult::NotReady);
    };
    let Some(qnm) = qname_module_of(build, target) else {
        return Ok(ApplyResult::NotReady);
    };
    if let Some(wanted) = revision {
        if qnm.revision != Some(wanted) {
            return Ok(ApplyResult::NotReady);
        }
    }

    let sref = build.arena[ctx].sref.clone();
    namespace::put(
        &mut build.arena,
        &mut build.globals,
        ctx,
        NamespaceId::PrefixToModule,
        NsKey::Prefix(prefix.to_string()),
        NsValue::Module(qnm),
        sref.clone(),
    )?;
    namespace::put(
        &mut build.arena,
        &mut build.globals,
        ctx,
        NamespaceId::ImportedModule,
        NsKey::Prefix(prefix.to_string()),
        NsValue::Ctx(target),
        sref,
    )?;
    Ok(ApplyResult::Applied)
}

fn resolve_include(
    build: &mut Reactor,
    ctx: CtxId,
    submodule: &str,
) -> Result<ApplyResult, BuildError> {
    let Some(sub) = namespace::get(
        &build.arena,
        &build.globals,
        ctx,
        NamespaceId::SubmoduleByName,
        &NsKey::Name(submodule.to_string()),
    )
    .and_then(|v| v.as_ctx()) else {
        return Ok(ApplyResult::NotReady);
    };

    let including_root = build.arena.root_of(ctx);
    // A submodule may include its siblings; the owner to validate against is
    // then the including submodule's own belongs-to module.
    let module_name = if build.arena[including_root].keyword == "submodule" {
        match declared_belongs_to(build, including_root) {
            Some(owner) => owner,
            None => return Ok(ApplyResult::NotReady),
        }
    } else {
        match build.arena[including_root].argument.clone() {
            Some(Argument::Identifier(name)) => name,
            _ => return Ok(ApplyResult::NotReady),
        }
    };
    match declared_belongs_to(build, sub) {
        Some(owner) if owner == module_name => {}
        Some(owner) => {
            return Err(BuildError::Syntax {
                message: format!(
                    "included submodule '{}' belongs to module '{}', not '{}'",
                    submodule, owner, module_name
                ),
                sref: build.arena[ctx].sref.clone(),
            });
        }
        None => {
            return Err(BuildError::Cardinality {
                message: format!("submodule '{}' has no 'belongs-to' substatement", submodule),
                sref: build.arena[sub].sref.clone(),
            });
        }
    }

    if let Some(cycle) = find_include_cycle(build, including_root) {
        return Err(BuildError::Circular {
            what: format!("include of submodule '{}'", submodule),
            cycle,
            sref: build.arena[ctx].sref.clone(),
        });
    }

    let owner = namespace::get(
        &build.arena,
        &build.globals,
        ctx,
        NamespaceId::ModuleByName,
        &NsKey::Name(module_name.clone()),
    )
    .and_then(|v| v.as_ctx());
    let Some(owner) = owner else {
        return Ok(ApplyResult::NotReady);
    };
    let Some(qnm) = qname_module_of(build, owner) else {
        return Ok(ApplyResult::NotReady);
    };

    let sref = build.arena[ctx].sref.clone();
    namespace::put(
        &mut build.arena,
        &mut build.globals,
        ctx,
        NamespaceId::IncludedSubmodule,
        NsKey::Name(submodule.to_string()),
        NsValue::Ctx(sub),
        sref.clone(),
    )?;
    // The submodule shares its parent module's QNameModule and sees it under
    // the belongs-to prefix.
    if qname_module_of(build, sub).is_none() {
        namespace::put(
            &mut build.arena,
            &mut build.globals,
            sub,
            NamespaceId::ModuleToQNameModule,
            NsKey::Ctx(sub),
            NsValue::Module(qnm.clone()),
            sref.clone(),
        )?;
    }
    // Both the module and a sibling submodule may include this one; the
    // owner link is the same either way.
    if belongs_to_module_ctx(build, sub).is_none() {
        namespace::put(
            &mut build.arena,
            &mut build.globals,
            sub,
            NamespaceId::BelongsToModule,
            NsKey::Name(module_name),
            NsValue::Ctx(owner),
            sref.clone(),
        )?;
    }
    if let Some(belongs_to_ctx) = build.arena[sub]
        .declared
        .iter()
        .copied()
        .find(|c| build.arena[*c].keyword == "belongs-to")
    {
        if let Some(prefix_ctx) = build.arena[belongs_to_ctx]
            .declared
            .iter()
            .copied()
            .find(|c| build.arena[*c].keyword == "prefix")
        {
            let prefix = build.arena[prefix_ctx].raw_argument.clone();
            if let Some(prefix) = prefix {
                // May already be present if two includes raced; the prefix
                // maps to the same module either way.
                let _ = namespace::put(
                    &mut build.arena,
                    &mut build.globals,
                    sub,
                    NamespaceId::PrefixToModule,
                    NsKey::Prefix(prefix),
                    NsValue::Module(qnm),
                    sref,
                );
            }
        }
    }
    Ok(ApplyResult::Applied)
}

fn declared_belongs_to(build: &Reactor, root: CtxId) -> Option<String> {
    build.arena[root]
        .declared
        .iter()
        .copied()
        .find(|c| build.arena[*c].keyword == "belongs-to")
        .and_then(|c| match build.arena[c].argument.clone() {
            Some(Argument::Identifier(name)) => Some(name),
            _ => build.arena[c].raw_argument.clone(),
        })
}

/// Walk the declared include graph looking for a source name that repeats
/// along one path. Includes that do not resolve yet are skipped; they
/// report as unresolved on their own.
fn find_include_cycle(build: &Reactor, from: CtxId) -> Option<Vec<String>> {
    fn walk(build: &Reactor, node: CtxId, path: &mut Vec<String>) -> Option<Vec<String>> {
        let name = match build.arena[node].argument.clone() {
            Some(Argument::Identifier(name)) => name,
            _ => return None,
        };
        if let Some(at) = path.iter().position(|p| *p == name) {
            let mut cycle: Vec<String> = path[at..].to_vec();
            cycle.sort();
            return Some(cycle);
        }
        path.push(name);
        let includes: Vec<String> = build.arena[node]
            .declared
            .iter()
            .copied()
            .filter(|c| build.arena[*c].keyword == "include")
            .filter_map(|c| match build.arena[c].argument.clone() {
                Some(Argument::Identifier(name)) => Some(name),
                _ => build.arena[c].raw_argument.clone(),
            })
            .collect();
        for inc in includes {
            let next = namespace::get(
                &build.arena,
                &build.globals,
                node,
                NamespaceId::SubmoduleByName,
                &NsKey::Name(inc),
            )
            .and_then(|v| v.as_ctx());
            if let Some(next) = next {
                if let Some(cycle) = walk(build, next, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        None
    }
    walk(build, from, &mut Vec::new())
}

// ── Grouping resolution and uses expansion ──────────────────────────

/// Find the grouping definition a `uses` refers to.
///
/// Unprefixed names walk the lexical scope chain (including copy
/// provenance, so statements inside expanded groupings still see their
/// original siblings), then the root's included submodules, then — for
/// submodules — the owning module. Prefixed names go through the import
/// namespaces.
fn resolve_grouping(build: &Reactor, from: CtxId, target: &NodeName) -> Option<CtxId> {
    let key = NsKey::Name(target.name.clone());

    if let Some(prefix) = &target.prefix {
        let own = qname_module_of(build, build.arena.root_of(from));
        let mapped = namespace::get(
            &build.arena,
            &build.globals,
            from,
            NamespaceId::PrefixToModule,
            &NsKey::Prefix(prefix.clone()),
        )
        .and_then(|v| v.as_module().cloned())?;
        if own.as_ref() == Some(&mapped) {
            return resolve_grouping(build, from, &NodeName { prefix: None, name: target.name.clone() });
        }
        let imported = namespace::get(
            &build.arena,
            &build.globals,
            from,
            NamespaceId::ImportedModule,
            &NsKey::Prefix(prefix.clone()),
        )
        .and_then(|v| v.as_ctx())?;
        return lookup_in_scope(build, imported, &key)
            .or_else(|| lookup_in_included_submodules(build, imported, &key));
    }

    // Lexical scopes, nearest first, following copy provenance: a statement
    // inside an expanded grouping body still sees the definitions that were
    // in scope where the body was declared.
    let mut queue: VecDeque<CtxId> = VecDeque::new();
    let mut seen: HashSet<CtxId> = HashSet::new();
    queue.push_back(from);
    while let Some(cur) = queue.pop_front() {
        if !seen.insert(cur) {
            continue;
        }
        if let Some(found) = lookup_in_scope(build, cur, &key) {
            return Some(found);
        }
        if let Some(origin) = build.arena[cur].copied_from {
            queue.push_back(origin);
        }
        if let Some(parent) = build.arena[cur].parent {
            queue.push_back(parent);
        }
    }

    let root = build.arena.root_of(from);
    if let Some(found) = lookup_in_included_submodules(build, root, &key) {
        return Some(found);
    }
    if build.arena[root].keyword == "submodule" {
        if let Some(owner) = belongs_to_module_ctx(build, root) {
            if let Some(found) = lookup_in_scope(build, owner, &key)
                .or_else(|| lookup_in_included_submodules(build, owner, &key))
            {
                return Some(found);
            }
        }
    }
    None
}

fn lookup_in_scope(build: &Reactor, scope: CtxId, key: &NsKey) -> Option<CtxId> {
    build.arena[scope]
        .table(NamespaceId::Grouping)
        .and_then(|t| t.get(key))
        .and_then(|e| e.value.as_ctx())
}

fn lookup_in_included_submodules(build: &Reactor, root: CtxId, key: &NsKey) -> Option<CtxId> {
    let table = build.arena[root].table(NamespaceId::IncludedSubmodule)?;
    let subs: Vec<CtxId> = table.values().filter_map(|e| e.value.as_ctx()).collect();
    subs.into_iter().find_map(|sub| lookup_in_scope(build, sub, key))
}

fn belongs_to_module_ctx(build: &Reactor, subroot: CtxId) -> Option<CtxId> {
    let table = build.arena[subroot].table(NamespaceId::BelongsToModule)?;
    table.values().find_map(|e| e.value.as_ctx())
}

/// Expand one `uses` statement: deep-copy the target grouping's body into
/// the uses' parent, tagging the copies, registering schema-tree children,
/// and queueing expansion of any nested `uses` inside the copies.
/// Idempotent: a second request on the same context is a no-op.
fn expand_uses(
    build: &mut Reactor,
    uses_ctx: CtxId,
    target: &NodeName,
) -> Result<ApplyResult, BuildError> {
    if build.arena[uses_ctx].expanded {
        return Ok(ApplyResult::Applied);
    }
    let Some(grouping) = resolve_grouping(build, uses_ctx, target) else {
        return Ok(ApplyResult::NotReady);
    };

    let ancestry = build.arena.expansion_ancestry(uses_ctx);
    if ancestry.contains(&grouping) {
        let mut cycle: Vec<String> = ancestry
            .iter()
            .filter_map(|g| match build.arena[*g].argument.clone() {
                Some(Argument::Identifier(name)) => Some(name),
                _ => build.arena[*g].raw_argument.clone(),
            })
            .collect();
        cycle.sort();
        return Err(BuildError::Circular {
            what: format!("grouping '{}'", target),
            cycle,
            sref: build.arena[uses_ctx].sref.clone(),
        });
    }

    let parent = build.arena[uses_ctx]
        .parent
        .expect("a uses statement always has a parent");
    let body: Vec<CtxId> = build.arena[grouping].declared.clone();
    for child in body {
        let keyword = build.arena[child].keyword.clone();
        // Documentation statements describe the grouping, not its
        // instantiations.
        if matches!(keyword.as_str(), "description" | "reference" | "status") {
            continue;
        }
        let copy = build.arena.copy_as_child_of(child, parent, CopyType::AddedByUses);
        build.arena[copy].expanded_via = Some(uses_ctx);
        integrate_copy(build, parent, copy)?;
    }

    // Augments declared under this uses refine the freshly copied subtree;
    // they resolve relative to the uses' parent.
    let augments: Vec<CtxId> = build.arena[uses_ctx]
        .declared
        .iter()
        .copied()
        .filter(|c| build.arena[*c].keyword == "augment")
        .collect();
    for augment in augments {
        if let Some(Argument::SchemaNodeId(path)) = build.arena[augment].argument.clone() {
            build.push_modifier(Modifier {
                ctx: augment,
                action: InferenceAction::ApplyAugment { path },
            });
        }
    }

    build.arena[uses_ctx].expanded = true;
    Ok(ApplyResult::Applied)
}

/// Post-copy bookkeeping shared by uses expansion and augment splicing:
/// rebuild child namespaces throughout the copied subtree and queue any
/// nested `uses` statements it carries. Copied grouping definitions are not
/// descended into; they expand where they are instantiated.
fn integrate_copy(build: &mut Reactor, parent: CtxId, copy: CtxId) -> Result<(), BuildError> {
    let registry = build.registry();
    let mut stack: Vec<(CtxId, CtxId)> = vec![(copy, parent)];
    while let Some((cur, par)) = stack.pop() {
        let keyword = build.arena[cur].keyword.clone();
        if registry.get(&keyword).is_data_node() && build.arena[par].keyword != "uses" {
            if let Some(Argument::Identifier(name)) = build.arena[cur].argument.clone() {
                let sref = build.arena[cur].sref.clone();
                register_schema_tree_child(&mut build.arena, par, &name, cur, sref)?;
            }
        }
        if keyword == "uses"
            && !build.arena[cur].expanded
            && !build.arena.has_ancestor_keyword(cur, "grouping")
        {
            if let Some(Argument::NodeName(target)) = build.arena[cur].argument.clone() {
                build.push_modifier(Modifier {
                    ctx: cur,
                    action: InferenceAction::ExpandUses { target },
                });
            }
        }
        // Leafref paths in copied bodies resolve at the copy's position.
        if keyword == "path" {
            if let Some(modifier) = leafref_modifier(build, cur)? {
                build.push_modifier(modifier);
            }
        }
        if keyword != "grouping" {
            for child in build.arena.effective_substatements(cur) {
                stack.push((child, cur));
            }
        }
    }
    Ok(())
}

// ── Augment application ─────────────────────────────────────────────

fn apply_augment(
    build: &mut Reactor,
    aug_ctx: CtxId,
    path: &SchemaNodeId,
) -> Result<ApplyResult, BuildError> {
    if build.arena[aug_ctx].expanded {
        return Ok(ApplyResult::Applied);
    }

    let base = if path.absolute {
        match path_base_module(build, aug_ctx, path) {
            Some(base) => base,
            None => return Ok(ApplyResult::NotReady),
        }
    } else {
        // Relative augment: declared under a uses statement, resolved
        // against the node the uses expanded into.
        let uses = build.arena[aug_ctx].parent.expect("relative augment sits under uses");
        match build.arena[uses].parent {
            Some(p) => p,
            None => return Ok(ApplyResult::NotReady),
        }
    };

    let mut cursor = base;
    for step in &path.path {
        match find_child_schema_node(build, cursor, &step.name)? {
            Some(next) => cursor = next,
            // The target may be produced by an expansion or augment that
            // has not run yet; retry later.
            None => return Ok(ApplyResult::NotReady),
        }
    }
    let target = cursor;

    let under_uses = build.arena[aug_ctx]
        .parent
        .is_some_and(|p| build.arena[p].keyword == "uses");
    let body: Vec<CtxId> = build.arena[aug_ctx].declared.clone();
    for child in body {
        let keyword = build.arena[child].keyword.clone();
        if matches!(
            keyword.as_str(),
            "when" | "description" | "reference" | "status" | "if-feature"
        ) {
            continue;
        }
        let copy = build.arena.copy_as_child_of(child, target, CopyType::AddedByAugmentation);
        if under_uses {
            // Contents spliced through a uses-level augment carry both tags.
            build
                .arena
                .merge_history(copy, CopyHistory::original().with(CopyType::AddedByUses));
        }
        integrate_copy(build, target, copy)?;
    }

    build.arena[aug_ctx].expanded = true;
    Ok(ApplyResult::Applied)
}

/// Resolve the module root an absolute schema path starts in.
fn path_base_module(build: &Reactor, from_ctx: CtxId, path: &SchemaNodeId) -> Option<CtxId> {
    let first = path.path.first()?;
    let Some(prefix) = &first.prefix else {
        return Some(build.arena.root_of(from_ctx));
    };
    let own_root = build.arena.root_of(from_ctx);
    let own = qname_module_of(build, own_root);
    let mapped = namespace::get(
        &build.arena,
        &build.globals,
        from_ctx,
        NamespaceId::PrefixToModule,
        &NsKey::Prefix(prefix.clone()),
    )
    .and_then(|v| v.as_module().cloned())?;
    if own.as_ref() == Some(&mapped) {
        return Some(own_root);
    }
    namespace::get(
        &build.arena,
        &build.globals,
        from_ctx,
        NamespaceId::ImportedModule,
        &NsKey::Prefix(prefix.clone()),
    )
    .and_then(|v| v.as_ctx())
}

/// The derived child-schema-node lookup: consult the stored child table
/// first; on a miss, materialize any unexpanded `uses` children of the node
/// (guarded against re-entry) and retry exactly once.
pub fn find_child_schema_node(
    build: &mut Reactor,
    node: CtxId,
    name: &str,
) -> Result<Option<CtxId>, BuildError> {
    if let Some(found) = namespace::stored_child(&build.arena, node, name) {
        return Ok(Some(found));
    }

    let pending: Vec<(CtxId, NodeName)> = build
        .arena
        .effective_substatements(node)
        .into_iter()
        .filter(|c| build.arena[*c].keyword == "uses" && !build.arena[*c].expanded)
        .filter_map(|c| match build.arena[c].argument.clone() {
            Some(Argument::NodeName(target)) => Some((c, target)),
            _ => None,
        })
        .collect();
    if pending.is_empty() {
        return Ok(None);
    }

    if build.arena[node].expanding {
        return Err(BuildError::Circular {
            what: format!("on-demand expansion of '{}'", name),
            cycle: vec![name.to_string()],
            sref: build.arena[node].sref.clone(),
        });
    }
    build.arena[node].expanding = true;
    let mut result = Ok(());
    for (uses_ctx, target) in pending {
        // NotReady is fine here: the lookup simply misses and the caller
        // defers.
        if let Err(e) = expand_uses(build, uses_ctx, &target) {
            result = Err(e);
            break;
        }
    }
    build.arena[node].expanding = false;
    result?;

    Ok(namespace::stored_child(&build.arena, node, name))
}

// ── Identity base resolution ────────────────────────────────────────

fn resolve_base(
    build: &mut Reactor,
    ctx: CtxId,
    base: &NodeName,
) -> Result<ApplyResult, BuildError> {
    let root = build.arena.root_of(ctx);
    let target_module = match &base.prefix {
        None => qname_module_of(build, root),
        Some(prefix) => namespace::get(
            &build.arena,
            &build.globals,
            ctx,
            NamespaceId::PrefixToModule,
            &NsKey::Prefix(prefix.clone()),
        )
        .and_then(|v| v.as_module().cloned()),
    };
    let Some(qnm) = target_module else {
        return Ok(ApplyResult::NotReady);
    };
    let qname = match QName::new(qnm, &base.name) {
        Ok(q) => q,
        Err(e) => {
            return Err(BuildError::Syntax {
                message: e.to_string(),
                sref: build.arena[ctx].sref.clone(),
            })
        }
    };
    let found = namespace::get(
        &build.arena,
        &build.globals,
        ctx,
        NamespaceId::Identity,
        &NsKey::QName(qname),
    );
    match found {
        Some(_) => Ok(ApplyResult::Applied),
        None => Ok(ApplyResult::NotReady),
    }
}

// ── Leafref path resolution ─────────────────────────────────────────

/// Resolve one leafref `path` against the schema tree. `ctx` is the path
/// statement; its grandparent is the leaf carrying the leafref type.
fn resolve_leafref(
    build: &mut Reactor,
    ctx: CtxId,
    up: usize,
    path: &SchemaNodeId,
) -> Result<ApplyResult, BuildError> {
    let Some(leaf) = build.arena[ctx].parent.and_then(|t| build.arena[t].parent) else {
        return Ok(ApplyResult::NotReady);
    };

    let mut cursor = if path.absolute {
        match path_base_module(build, ctx, path) {
            Some(base) => base,
            None => return Ok(ApplyResult::NotReady),
        }
    } else {
        // Relative paths start at the leafref leaf itself; each `../` step
        // climbs one schema level.
        let mut node = leaf;
        for _ in 0..up {
            match build.arena[node].parent {
                Some(p) => node = p,
                None => return Ok(ApplyResult::NotReady),
            }
        }
        node
    };

    for step in &path.path {
        match find_child_schema_node(build, cursor, &step.name)? {
            Some(next) => cursor = next,
            // The target may be produced by an expansion that has not run
            // yet; retry later.
            None => return Ok(ApplyResult::NotReady),
        }
    }

    if !matches!(build.arena[cursor].keyword.as_str(), "leaf" | "leaf-list") {
        return Err(BuildError::Syntax {
            message: format!(
                "leafref path '{}{}' must target a leaf or leaf-list, found '{}'",
                "../".repeat(up),
                path,
                build.arena[cursor].keyword
            ),
            sref: build.arena[ctx].sref.clone(),
        });
    }
    Ok(ApplyResult::Applied)
}

// ── Diagnostics support ─────────────────────────────────────────────

/// Names a user plausibly meant, for "did you mean" suggestions attached to
/// unresolved-reference reports.
pub fn candidates_for(
    arena: &crate::compiler::context::ContextArena,
    globals: &NamespaceStorage,
    modifier: &Modifier,
) -> Vec<String> {
    match &modifier.action {
        InferenceAction::ExpandUses { .. } => {
            namespace::visible_names(arena, modifier.ctx, NamespaceId::Grouping)
        }
        InferenceAction::ResolveImport { .. } => globals
            .table(NamespaceId::ModuleByName)
            .map(|t| t.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default(),
        InferenceAction::ResolveInclude { .. } => globals
            .table(NamespaceId::SubmoduleByName)
            .map(|t| t.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default(),
        InferenceAction::ResolveBase { .. } => globals
            .table(NamespaceId::Identity)
            .map(|t| {
                t.keys()
                    .filter_map(|k| match k {
                        NsKey::QName(q) => Some(q.local_name().to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        InferenceAction::ApplyAugment { .. } | InferenceAction::ResolveLeafref { .. } => {
            Vec::new()
        }
    }
}
