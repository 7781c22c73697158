//! Leafref path resolution against the schema tree.

use yangc_compiler::compiler::ir::IrStatement;
use yangc_compiler::compiler::testing_helpers::*;
use yangc_compiler::BuildError;

fn leafref(name: &str, path: &str) -> IrStatement {
    IrStatement::new("leaf", Some(name)).with(
        IrStatement::new("type", Some("leafref")).with(IrStatement::new("path", Some(path))),
    )
}

#[test]
fn relative_leafref_resolves_to_a_sibling() {
    let m = module("m", "urn:m", "m").with(
        container("c")
            .with(leaf("name", "string"))
            .with(leafref("alias", "../name")),
    );
    build_ok(vec![("m", m)]);
}

#[test]
fn absolute_leafref_resolves_across_the_tree() {
    let m = module("m", "urn:m", "m")
        .with(container("a").with(leaf("id", "string")))
        .with(container("b").with(leafref("ref", "/a/id")));
    build_ok(vec![("m", m)]);
}

#[test]
fn leafref_target_created_by_uses_expansion() {
    let m = module("m", "urn:m", "m")
        .with(grouping("g").with(leaf("id", "string")))
        .with(container("c").with(uses("g")))
        .with(container("d").with(leafref("ref", "/c/id")));
    build_ok(vec![("m", m)]);
}

#[test]
fn leafref_inside_grouping_resolves_at_instantiation() {
    let pair = grouping("pair")
        .with(leaf("name", "string"))
        .with(leafref("alias", "../name"));
    let m = module("m", "urn:m", "m")
        .with(pair)
        .with(container("c").with(uses("pair")));

    let model = build_ok(vec![("m", m)]);
    assert!(model.find_schema_node("m", &["c", "alias"]).is_some());
}

#[test]
fn unresolved_leafref_is_reported() {
    let m = module("m", "urn:m", "m").with(container("c").with(leafref("ref", "../nope")));

    match build_err(vec![("m", m)]) {
        BuildError::Unresolved(refs) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].keyword, "leafref");
            assert_eq!(refs[0].target, "../nope");
        }
        other => panic!("expected Unresolved, got {:?}", other),
    }
}

#[test]
fn leafref_must_target_a_leaf() {
    let m = module("m", "urn:m", "m")
        .with(container("a").with(container("b")))
        .with(container("c").with(leafref("ref", "/a/b")));

    match build_err(vec![("m", m)]) {
        BuildError::Syntax { message, .. } => {
            assert!(message.contains("leaf or leaf-list"), "got: {}", message);
        }
        other => panic!("expected Syntax, got {:?}", other),
    }
}

#[test]
fn leafref_without_path_is_rejected() {
    let m = module("m", "urn:m", "m").with(container("c").with(leaf("ref", "leafref")));

    match build_err(vec![("m", m)]) {
        BuildError::Cardinality { message, .. } => {
            assert!(message.contains("path"), "got: {}", message);
        }
        other => panic!("expected Cardinality, got {:?}", other),
    }
}

#[test]
fn bare_relative_path_is_rejected() {
    let m = module("m", "urn:m", "m")
        .with(container("c").with(leaf("name", "string")).with(leafref("alias", "name")));

    match build_err(vec![("m", m)]) {
        BuildError::Syntax { message, .. } => {
            assert!(message.contains("absolute or start with"), "got: {}", message);
        }
        other => panic!("expected Syntax, got {:?}", other),
    }
}
