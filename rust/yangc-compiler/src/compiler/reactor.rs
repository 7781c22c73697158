//! The statement inference reactor.
//!
//! Drives every statement context of every source through the model
//! processing phases in lock-step. Within a phase, statement supports may
//! defer work that depends on statements processed later (or in another
//! source) by registering a [`Modifier`]; the reactor retries all deferred
//! modifiers until a full sweep applies none of them (a fixed point). A
//! fixed point with outstanding modifiers fails the build with an aggregate
//! error listing every still-blocked statement, so one compile surfaces all
//! broken references at once.

use crate::compiler::context::{ContextArena, CtxId};
use crate::compiler::effective;
use crate::compiler::ir::IrStatement;
use crate::compiler::namespace::{self, NamespaceId, NamespaceStorage, NsKey, NsValue};
use crate::compiler::phase::ModelProcessingPhase;
use crate::compiler::support::{NodeName, SchemaNodeId, SupportRegistry};
use crate::compiler::supports;
use crate::{BuildError, EffectiveModelContext, UnresolvedRef};
use log::{debug, trace};
use std::sync::Arc;
use yangc_core::{Revision, SourceIdentifier};

/// One ingested source document.
#[derive(Debug)]
pub struct SourceState {
    pub id: SourceIdentifier,
    pub root: CtxId,
}

/// A deferred resolution action registered against the current phase.
#[derive(Debug, Clone)]
pub struct Modifier {
    /// The statement waiting on the action.
    pub ctx: CtxId,
    pub action: InferenceAction,
}

#[derive(Debug, Clone)]
pub enum InferenceAction {
    ResolveImport { module: String, revision: Option<Revision>, prefix: String },
    ResolveInclude { submodule: String },
    ExpandUses { target: NodeName },
    ApplyAugment { path: SchemaNodeId },
    ResolveBase { base: NodeName },
    ResolveLeafref { up: usize, path: SchemaNodeId },
}

impl InferenceAction {
    /// `(keyword, target)` pair used in unresolved-reference reporting.
    pub fn describe(&self) -> (&'static str, String) {
        match self {
            InferenceAction::ResolveImport { module, .. } => ("import", module.clone()),
            InferenceAction::ResolveInclude { submodule } => ("include", submodule.clone()),
            InferenceAction::ExpandUses { target } => ("uses", target.to_string()),
            InferenceAction::ApplyAugment { path } => ("augment", path.to_string()),
            InferenceAction::ResolveBase { base } => ("base", base.to_string()),
            InferenceAction::ResolveLeafref { up, path } => {
                ("leafref", format!("{}{}", "../".repeat(*up), path))
            }
        }
    }
}

/// Outcome of one modifier application attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    NotReady,
}

/// The reactor for one build. Owns the whole statement graph; a build is
/// single-threaded and synchronous, so no locking happens anywhere inside.
pub struct Reactor {
    pub arena: ContextArena,
    pub globals: NamespaceStorage,
    pub sources: Vec<SourceState>,
    registry: Arc<SupportRegistry>,
    pending: Vec<Modifier>,
    current_phase: ModelProcessingPhase,
}

impl Default for Reactor {
    fn default() -> Self {
        Reactor::new()
    }
}

impl Reactor {
    pub fn new() -> Self {
        Reactor::with_registry(Arc::new(supports::default_registry()))
    }

    pub fn with_registry(registry: Arc<SupportRegistry>) -> Self {
        Reactor {
            arena: ContextArena::new(),
            globals: NamespaceStorage::new(),
            sources: Vec::new(),
            registry,
            pending: Vec::new(),
            current_phase: ModelProcessingPhase::Init,
        }
    }

    pub fn registry(&self) -> Arc<SupportRegistry> {
        self.registry.clone()
    }

    /// Ingest one source document. The root statement must be a `module` or
    /// `submodule`.
    pub fn add_source(
        &mut self,
        id: SourceIdentifier,
        ir: &IrStatement,
    ) -> Result<(), BuildError> {
        assert_eq!(
            self.current_phase,
            ModelProcessingPhase::Init,
            "sources may only be added before the build starts"
        );
        if ir.keyword != "module" && ir.keyword != "submodule" {
            return Err(BuildError::Syntax {
                message: format!(
                    "root statement must be 'module' or 'submodule', found '{}'",
                    ir.keyword
                ),
                sref: yangc_core::StatementSourceRef::new(id, ir.line, ir.col),
            });
        }
        let root = self.arena.ingest(ir, &id);
        self.sources.push(SourceState { id, root });
        Ok(())
    }

    /// Run all phases and freeze the converged graph into the immutable
    /// effective model.
    pub fn build(mut self) -> Result<EffectiveModelContext, BuildError> {
        for phase in ModelProcessingPhase::EXECUTION_ORDER {
            self.execute_phase(phase)?;
        }
        effective::assemble(&mut self)
    }

    /// Register a deferred action against the current phase.
    pub fn push_modifier(&mut self, modifier: Modifier) {
        self.pending.push(modifier);
    }

    pub fn current_phase(&self) -> ModelProcessingPhase {
        self.current_phase
    }

    fn execute_phase(&mut self, phase: ModelProcessingPhase) -> Result<(), BuildError> {
        debug_assert_eq!(phase.previous(), Some(self.current_phase));
        debug!("phase {} started ({} contexts)", phase, self.arena.len());
        self.current_phase = phase;

        match phase {
            ModelProcessingPhase::Init => {}
            ModelProcessingPhase::SourcePreLinkage => self.source_pre_linkage()?,
            ModelProcessingPhase::PreLinkage => self.sweep_pre_linkage()?,
            ModelProcessingPhase::Linkage => {
                self.sweep_linkage()?;
                self.run_deferred()?;
            }
            ModelProcessingPhase::StatementDefinition => self.statement_definition()?,
            ModelProcessingPhase::FullDeclaration => {
                self.sweep_full_declaration()?;
                self.run_deferred()?;
            }
            // Freezing happens in effective::assemble once phases are done.
            ModelProcessingPhase::EffectiveModel => {}
        }

        for id in self.arena.ids().collect::<Vec<_>>() {
            self.arena.set_phase(id, phase);
        }
        debug!("phase {} finished", phase);
        Ok(())
    }

    /// Phase 1: parse each root's own header argument and register its name
    /// globally so later phases can detect missing dependencies early.
    fn source_pre_linkage(&mut self) -> Result<(), BuildError> {
        let roots: Vec<CtxId> = self.sources.iter().map(|s| s.root).collect();
        let registry = self.registry.clone();
        for root in roots {
            let keyword = self.arena[root].keyword.clone();
            let support = registry.get(&keyword);
            let raw = self.arena[root].raw_argument.clone();
            let sref = self.arena[root].sref.clone();
            let argument = support.parse_argument(raw.as_deref(), &sref)?;
            let name = match &argument {
                crate::compiler::support::Argument::Identifier(name) => name.clone(),
                _ => unreachable!("module/submodule arguments are identifiers"),
            };
            self.arena[root].argument = Some(argument);

            let ns = if keyword == "module" {
                NamespaceId::ModuleByName
            } else {
                NamespaceId::SubmoduleByName
            };
            namespace::put(
                &mut self.arena,
                &mut self.globals,
                root,
                ns,
                NsKey::Name(name),
                NsValue::Ctx(root),
                sref,
            )?;
        }
        Ok(())
    }

    fn sweep_pre_linkage(&mut self) -> Result<(), BuildError> {
        let registry = self.registry.clone();
        for id in self.snapshot_ids() {
            let keyword = self.arena[id].keyword.clone();
            registry.get(&keyword).on_pre_linkage(self, id)?;
        }
        Ok(())
    }

    fn sweep_linkage(&mut self) -> Result<(), BuildError> {
        let registry = self.registry.clone();
        for id in self.snapshot_ids() {
            let keyword = self.arena[id].keyword.clone();
            if let Some(modifier) = registry.get(&keyword).on_linkage(self, id)? {
                self.pending.push(modifier);
            }
        }
        Ok(())
    }

    /// Phase 4: parse every remaining argument and validate each statement's
    /// substatement grammar, then populate symbol tables (schema-tree
    /// children, groupings, typedefs, identities).
    fn statement_definition(&mut self) -> Result<(), BuildError> {
        let registry = self.registry.clone();
        let ids = self.snapshot_ids();

        for &id in &ids {
            let keyword = self.arena[id].keyword.clone();
            let support = registry.get(&keyword);
            if self.arena[id].argument.is_none() {
                let raw = self.arena[id].raw_argument.clone();
                let sref = self.arena[id].sref.clone();
                let argument = support.parse_argument(raw.as_deref(), &sref)?;
                self.arena[id].argument = Some(argument);
            }
            self.validate_grammar(id, support.substatement_grammar())?;
        }

        for &id in &ids {
            supports::register_symbols(self, id)?;
        }
        Ok(())
    }

    fn validate_grammar(
        &self,
        id: CtxId,
        grammar: &[crate::compiler::support::GrammarRow],
    ) -> Result<(), BuildError> {
        if grammar.is_empty() {
            return Ok(());
        }
        let node = &self.arena[id];
        for (keyword, cardinality) in grammar {
            let count = node
                .declared
                .iter()
                .filter(|c| self.arena[**c].keyword == *keyword)
                .count();
            if !cardinality.check(count) {
                return Err(BuildError::Cardinality {
                    message: format!(
                        "'{}' statement has {} '{}' substatement(s), which violates its cardinality ({:?})",
                        node.keyword, count, keyword, cardinality
                    ),
                    sref: node.sref.clone(),
                });
            }
        }
        Ok(())
    }

    fn sweep_full_declaration(&mut self) -> Result<(), BuildError> {
        let registry = self.registry.clone();
        for id in self.snapshot_ids() {
            let keyword = self.arena[id].keyword.clone();
            if let Some(modifier) = registry.get(&keyword).on_full_declaration(self, id)? {
                self.pending.push(modifier);
            }
        }
        Ok(())
    }

    /// Retry all deferred modifiers until a fixed point. Applying a modifier
    /// may enqueue new ones (nested `uses` inside an expanded grouping); any
    /// application counts as progress. At a fixed point with outstanding
    /// modifiers the build fails, reporting every blocked statement.
    fn run_deferred(&mut self) -> Result<(), BuildError> {
        loop {
            if self.pending.is_empty() {
                return Ok(());
            }
            let batch = std::mem::take(&mut self.pending);
            let mut still_pending = Vec::new();
            let mut progressed = false;

            for modifier in batch {
                match supports::try_apply_modifier(self, &modifier)? {
                    ApplyResult::Applied => {
                        progressed = true;
                        trace!(
                            "modifier {:?} applied in phase {}",
                            modifier.action.describe(),
                            self.current_phase
                        );
                    }
                    ApplyResult::NotReady => still_pending.push(modifier),
                }
            }

            // New modifiers enqueued by applied actions go behind the ones
            // that were deferred, keeping retry order deterministic.
            let newly_added = std::mem::take(&mut self.pending);
            still_pending.extend(newly_added);
            self.pending = still_pending;

            if !progressed {
                break;
            }
            trace!("re-running {} deferred modifier(s)", self.pending.len());
        }

        let unresolved: Vec<UnresolvedRef> = self
            .pending
            .drain(..)
            .map(|m| {
                let (keyword, target) = m.action.describe();
                UnresolvedRef {
                    phase: self.current_phase,
                    keyword: keyword.to_string(),
                    target,
                    sref: self.arena[m.ctx].sref.clone(),
                    candidates: supports::candidates_for(&self.arena, &self.globals, &m),
                }
            })
            .collect();
        debug!(
            "phase {} blocked with {} unresolved statement(s)",
            self.current_phase,
            unresolved.len()
        );
        Err(BuildError::Unresolved(unresolved))
    }

    fn snapshot_ids(&self) -> Vec<CtxId> {
        self.arena.ids().collect()
    }
}
