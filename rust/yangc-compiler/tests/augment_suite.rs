//! Augment application: absolute and uses-level targets, splice provenance.

use yangc_compiler::compiler::copy_history::CopyType;
use yangc_compiler::compiler::ir::IrStatement;
use yangc_compiler::compiler::testing_helpers::*;
use yangc_compiler::BuildError;

#[test]
fn absolute_augment_adds_node_to_target() {
    let m = module("m", "urn:m", "m")
        .with(container("c"))
        .with(augment("/c").with(leaf("extra", "string")));

    let model = build_ok(vec![("m", m)]);
    let extra = model.find_schema_node("m", &["c", "extra"]).unwrap();
    assert!(extra.copy_history.contains(CopyType::AddedByAugmentation));
    assert!(!extra.copy_history.contains(CopyType::AddedByUses));

    // The augment statement is consumed by its application.
    let root = model.find_module_by_name("m").unwrap();
    assert!(root.substatements.iter().all(|s| s.keyword != "augment"));
}

#[test]
fn augment_walks_multi_step_paths() {
    let m = module("m", "urn:m", "m")
        .with(container("outer").with(container("inner")))
        .with(augment("/outer/inner").with(leaf("deep", "string")));

    let model = build_ok(vec![("m", m)]);
    assert!(model.find_schema_node("m", &["outer", "inner", "deep"]).is_some());
}

#[test]
fn cross_module_augment_keeps_augmenting_namespace() {
    let lib = module("lib", "urn:lib", "lib").with(container("c"));
    let app = module("app", "urn:app", "app")
        .with(import("lib", "l"))
        .with(augment("/l:c").with(leaf("extra", "string")));

    let model = build_ok(vec![("app", app), ("lib", lib)]);
    let extra = model.find_schema_node("lib", &["c", "extra"]).unwrap();
    assert!(extra.copy_history.contains(CopyType::AddedByAugmentation));
    // Spliced nodes stay qualified by the module that declared them.
    assert_eq!(extra.qname.as_ref().unwrap().module.namespace.as_str(), "urn:app");
}

#[test]
fn augment_target_created_by_uses_expansion() {
    let m = module("m", "urn:m", "m")
        .with(grouping("g").with(container("c")))
        .with(uses("g"))
        .with(augment("/c").with(leaf("extra", "string")));

    let model = build_ok(vec![("m", m)]);
    let extra = model.find_schema_node("m", &["c", "extra"]).unwrap();
    assert!(extra.copy_history.contains(CopyType::AddedByAugmentation));
}

#[test]
fn uses_level_augment_tags_content_with_both_mechanisms() {
    let m = module("m", "urn:m", "m")
        .with(grouping("g").with(container("inner")))
        .with(
            container("c")
                .with(uses("g").with(augment("inner").with(leaf("extra", "string")))),
        );

    let model = build_ok(vec![("m", m)]);
    let extra = model.find_schema_node("m", &["c", "inner", "extra"]).unwrap();
    assert!(extra.copy_history.contains(CopyType::AddedByAugmentation));
    assert!(extra.copy_history.contains(CopyType::AddedByUses));
}

#[test]
fn unresolvable_augment_target_is_reported() {
    let m = module("m", "urn:m", "m")
        .with(container("c"))
        .with(augment("/nope").with(leaf("extra", "string")));

    match build_err(vec![("m", m)]) {
        BuildError::Unresolved(refs) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].keyword, "augment");
            assert_eq!(refs[0].target, "/nope");
        }
        other => panic!("expected Unresolved, got {:?}", other),
    }
}

#[test]
fn top_level_augment_must_be_absolute() {
    let m = module("m", "urn:m", "m")
        .with(container("c"))
        .with(augment("c").with(leaf("extra", "string")));

    match build_err(vec![("m", m)]) {
        BuildError::Syntax { message, .. } => {
            assert!(message.contains("absolute"), "got: {}", message);
        }
        other => panic!("expected Syntax, got {:?}", other),
    }
}

#[test]
fn uses_level_augment_must_be_relative() {
    let m = module("m", "urn:m", "m")
        .with(grouping("g").with(container("inner")))
        .with(
            container("c")
                .with(uses("g").with(augment("/c/inner").with(leaf("extra", "string")))),
        );

    match build_err(vec![("m", m)]) {
        BuildError::Syntax { message, .. } => {
            assert!(message.contains("relative"), "got: {}", message);
        }
        other => panic!("expected Syntax, got {:?}", other),
    }
}

#[test]
fn when_and_documentation_are_not_spliced() {
    let m = module("m", "urn:m", "m")
        .with(container("c"))
        .with(
            augment("/c")
                .with(IrStatement::new("when", Some("../enabled = 'true'")))
                .with(leaf("extra", "string")),
        );

    let model = build_ok(vec![("m", m)]);
    let c = model.find_schema_node("m", &["c"]).unwrap();
    assert!(c.substatements.iter().all(|s| s.keyword != "when"));
    assert!(model.find_schema_node("m", &["c", "extra"]).is_some());
}
