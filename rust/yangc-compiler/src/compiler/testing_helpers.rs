//! IR construction and build assertion helpers shared by the test suites.
//!
//! Statement trees are assembled with the [`IrStatement`] builder; these
//! shorthands cover the statement shapes the suites use constantly.

use crate::compiler::ir::IrStatement;
use crate::{build_sources, BuildError, EffectiveModelContext};
use yangc_core::SourceIdentifier;

/// A `module` root with its mandatory `namespace` and `prefix` headers.
pub fn module(name: &str, uri: &str, prefix: &str) -> IrStatement {
    IrStatement::new("module", Some(name))
        .with(IrStatement::new("namespace", Some(uri)))
        .with(IrStatement::new("prefix", Some(prefix)))
}

/// A `submodule` root with its `belongs-to` header.
pub fn submodule(name: &str, owner: &str, prefix: &str) -> IrStatement {
    IrStatement::new("submodule", Some(name)).with(
        IrStatement::new("belongs-to", Some(owner))
            .with(IrStatement::new("prefix", Some(prefix))),
    )
}

pub fn import(module: &str, prefix: &str) -> IrStatement {
    IrStatement::new("import", Some(module))
        .with(IrStatement::new("prefix", Some(prefix)))
}

pub fn include(submodule: &str) -> IrStatement {
    IrStatement::new("include", Some(submodule))
}

pub fn container(name: &str) -> IrStatement {
    IrStatement::new("container", Some(name))
}

pub fn leaf(name: &str, ty: &str) -> IrStatement {
    IrStatement::new("leaf", Some(name)).with(IrStatement::new("type", Some(ty)))
}

pub fn grouping(name: &str) -> IrStatement {
    IrStatement::new("grouping", Some(name))
}

pub fn uses(target: &str) -> IrStatement {
    IrStatement::new("uses", Some(target))
}

pub fn augment(path: &str) -> IrStatement {
    IrStatement::new("augment", Some(path))
}

pub fn identity(name: &str) -> IrStatement {
    IrStatement::new("identity", Some(name))
}

/// Build the named sources, panicking with the rendered error on failure.
pub fn build_ok(sources: Vec<(&str, IrStatement)>) -> EffectiveModelContext {
    let sources = sources
        .into_iter()
        .map(|(name, ir)| (SourceIdentifier::new(name), ir))
        .collect();
    match build_sources(sources) {
        Ok(model) => model,
        Err(e) => panic!("expected build to succeed, got: {}", e),
    }
}

/// Build the named sources, panicking if the build unexpectedly succeeds.
pub fn build_err(sources: Vec<(&str, IrStatement)>) -> BuildError {
    let sources = sources
        .into_iter()
        .map(|(name, ir)| (SourceIdentifier::new(name), ir))
        .collect();
    match build_sources(sources) {
        Ok(model) => panic!(
            "expected build to fail, got a model with {} module(s)",
            model.module_count()
        ),
        Err(e) => e,
    }
}
