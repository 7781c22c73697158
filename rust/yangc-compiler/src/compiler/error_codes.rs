//! Stable error codes for all `BuildError` variants.
//!
//! Code ranges:
//!   E0001–E0009  Argument / syntax errors
//!   E0010–E0019  Substatement cardinality errors
//!   E0020–E0029  Name and namespace collisions
//!   E0030–E0039  Unresolved references
//!   E0040–E0049  Dependency cycles

use crate::BuildError;

/// Return the stable error code for the *first* sub-error inside a
/// `BuildError`. Compound errors (`Multiple`) return the code of the first
/// element so callers always get a valid string.
pub fn error_code(error: &BuildError) -> &'static str {
    match error {
        BuildError::Syntax { .. } => "E0001",
        BuildError::Cardinality { .. } => "E0010",
        BuildError::Collision { .. } => "E0020",
        BuildError::DuplicateNamespace { .. } => "E0021",
        BuildError::Unresolved(_) => "E0030",
        BuildError::Circular { .. } => "E0040",
        BuildError::Multiple(errors) => errors.first().map_or("E0001", error_code),
    }
}

/// Return a short documentation string for the given error code.
pub fn error_doc(code: &str) -> &'static str {
    match code {
        "E0001" => "A statement argument is malformed or missing. Check the argument against the statement's expected form (identifier, URI, date, node name, or path).",
        "E0010" => "A statement has the wrong number of substatements of some kind. For example, a module without a 'namespace' substatement, or a leaf with two 'type' substatements.",
        "E0020" => "The same name was registered twice in one namespace: two modules with the same name, two groupings in one scope, or two sibling data nodes sharing a name.",
        "E0021" => "Two modules declare the same namespace URI. Every module in a build must have a unique namespace.",
        "E0030" => "One or more references never resolved: a 'uses' naming an unknown grouping, an 'import' of a module not in the build, an 'augment' whose target path does not exist, or a 'base' naming an unknown identity. All blocked references are listed together.",
        "E0040" => "Groupings form a dependency cycle: expanding a 'uses' would instantiate a grouping that is already being expanded above it.",
        _ => "Unknown error code.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yangc_core::{SourceIdentifier, StatementSourceRef};

    fn sref() -> StatementSourceRef {
        StatementSourceRef::new(SourceIdentifier::new("m"), 1, 1)
    }

    #[test]
    fn test_every_variant_has_a_code() {
        let errors = [
            BuildError::Syntax { message: "x".into(), sref: sref() },
            BuildError::Cardinality { message: "x".into(), sref: sref() },
            BuildError::Collision { name: "x".into(), first: sref(), second: sref() },
            BuildError::DuplicateNamespace {
                namespace: "urn:x".into(),
                first: sref(),
                second: sref(),
            },
            BuildError::Unresolved(vec![]),
            BuildError::Circular { what: "x".into(), cycle: vec![], sref: sref() },
        ];
        for error in &errors {
            let code = error_code(error);
            assert!(code.starts_with('E'));
            assert_ne!(error_doc(code), "Unknown error code.");
        }
    }

    #[test]
    fn test_multiple_uses_first_code() {
        let inner = BuildError::Circular { what: "g".into(), cycle: vec![], sref: sref() };
        let multi = BuildError::Multiple(vec![inner]);
        assert_eq!(error_code(&multi), "E0040");
    }
}
