//! yangc-compiler — the schema compiler's inference core.
//!
//! Takes parsed statement trees ([`compiler::ir::IrStatement`]) for a set of
//! schema sources and drives them through the model processing phases to a
//! frozen [`EffectiveModelContext`]. Cross-source references (`import`,
//! `include`, `uses`, `augment`, identity `base`) are resolved by deferred
//! inference: statements that cannot resolve yet are retried until the whole
//! build reaches a fixed point, and a stuck build reports every blocked
//! statement at once rather than just the first.

pub mod compiler;
pub mod diagnostics;

use std::fmt;
use thiserror::Error;
use yangc_core::{SourceIdentifier, StatementSourceRef};

pub use compiler::effective::{EffectiveModelContext, EffectiveStatement};
pub use compiler::ir::IrStatement;
pub use compiler::phase::ModelProcessingPhase;
pub use compiler::reactor::Reactor;

/// One statement whose deferred resolution never completed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedRef {
    /// The phase that got stuck.
    pub phase: ModelProcessingPhase,
    /// Keyword of the blocked statement (`uses`, `import`, ...).
    pub keyword: String,
    /// The reference that failed to resolve, as written.
    pub target: String,
    pub sref: StatementSourceRef,
    /// Names the user plausibly meant, for "did you mean" rendering.
    pub candidates: Vec<String>,
}

impl fmt::Display for UnresolvedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: '{} {}' could not be resolved during {}",
            self.sref, self.keyword, self.target, self.phase
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("{sref}: {message}")]
    Syntax { message: String, sref: StatementSourceRef },

    #[error("{sref}: {message}")]
    Cardinality { message: String, sref: StatementSourceRef },

    #[error("'{name}' is already defined at {first}, redefined at {second}")]
    Collision { name: String, first: StatementSourceRef, second: StatementSourceRef },

    #[error("namespace '{namespace}' is claimed by both {first} and {second}")]
    DuplicateNamespace {
        namespace: String,
        first: StatementSourceRef,
        second: StatementSourceRef,
    },

    #[error("{} reference(s) failed to resolve:\n{}", .0.len(), render_unresolved(.0))]
    Unresolved(Vec<UnresolvedRef>),

    #[error("{sref}: {what} forms a dependency cycle through [{}]", cycle.join(", "))]
    Circular { what: String, cycle: Vec<String>, sref: StatementSourceRef },

    #[error("{} build error(s)", .0.len())]
    Multiple(Vec<BuildError>),
}

fn render_unresolved(refs: &[UnresolvedRef]) -> String {
    refs.iter().map(|r| format!("  {}", r)).collect::<Vec<_>>().join("\n")
}

impl BuildError {
    /// Construct a `BuildError` from a list of errors.
    ///
    /// Nested `Multiple` errors are flattened; an empty list yields `None`
    /// and a single error is returned unwrapped.
    pub fn from_multiple(errors: Vec<BuildError>) -> Option<BuildError> {
        let mut flattened: Vec<BuildError> = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                BuildError::Multiple(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }
        match flattened.len() {
            0 => None,
            1 => flattened.pop(),
            _ => Some(BuildError::Multiple(flattened)),
        }
    }
}

/// Build an effective model from a set of parsed sources in one call.
///
/// Convenience wrapper over [`Reactor`] for callers that do not need to
/// customize the statement support registry.
pub fn build_sources(
    sources: Vec<(SourceIdentifier, IrStatement)>,
) -> Result<EffectiveModelContext, BuildError> {
    let mut reactor = Reactor::new();
    for (id, ir) in &sources {
        reactor.add_source(id.clone(), ir)?;
    }
    reactor.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use yangc_core::SourceIdentifier;

    fn sref(line: usize) -> StatementSourceRef {
        StatementSourceRef::new(SourceIdentifier::new("m"), line, 1)
    }

    #[test]
    fn test_from_multiple_flattens() {
        let a = BuildError::Syntax { message: "a".into(), sref: sref(1) };
        let b = BuildError::Syntax { message: "b".into(), sref: sref(2) };
        let c = BuildError::Syntax { message: "c".into(), sref: sref(3) };

        assert_eq!(BuildError::from_multiple(vec![]), None);
        assert_eq!(BuildError::from_multiple(vec![a.clone()]), Some(a.clone()));

        let nested = BuildError::Multiple(vec![b.clone(), c.clone()]);
        let combined = BuildError::from_multiple(vec![a.clone(), nested]).unwrap();
        match combined {
            BuildError::Multiple(errors) => assert_eq!(errors, vec![a, b, c]),
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_display_lists_every_ref() {
        let err = BuildError::Unresolved(vec![
            UnresolvedRef {
                phase: ModelProcessingPhase::FullDeclaration,
                keyword: "uses".into(),
                target: "missing-grp".into(),
                sref: sref(4),
                candidates: vec![],
            },
            UnresolvedRef {
                phase: ModelProcessingPhase::FullDeclaration,
                keyword: "base".into(),
                target: "no-such-identity".into(),
                sref: sref(9),
                candidates: vec![],
            },
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("2 reference(s)"));
        assert!(rendered.contains("missing-grp"));
        assert!(rendered.contains("no-such-identity"));
        assert!(rendered.contains("FULL_DECLARATION"));
    }
}
