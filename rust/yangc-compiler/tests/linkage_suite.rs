//! Cross-source linkage: imports, includes, prefixes, revisions.

use yangc_compiler::compiler::ir::IrStatement;
use yangc_compiler::compiler::testing_helpers::*;
use yangc_compiler::BuildError;
use yangc_core::{QNameModule, XmlNamespace};

#[test]
fn import_resolves_regardless_of_source_order() {
    // The importing module is added first; resolution must wait for the
    // imported module instead of failing.
    let b = module("b", "urn:b", "b")
        .with(import("a", "a"))
        .with(container("top").with(uses("a:g")));
    let a = module("a", "urn:a", "a").with(grouping("g").with(leaf("x", "string")));

    let model = build_ok(vec![("b", b), ("a", a)]);
    assert_eq!(model.module_count(), 2);
    assert!(model.find_schema_node("b", &["top", "x"]).is_some());
}

#[test]
fn missing_import_reports_known_modules_as_candidates() {
    let a = module("a", "urn:a", "a");
    let b = module("b", "urn:b", "b").with(import("missing", "m"));

    match build_err(vec![("a", a), ("b", b)]) {
        BuildError::Unresolved(refs) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].keyword, "import");
            assert_eq!(refs[0].target, "missing");
            assert!(refs[0].candidates.contains(&"a".to_string()));
        }
        other => panic!("expected Unresolved, got {:?}", other),
    }
}

#[test]
fn duplicate_module_namespace_rejected() {
    let a = module("a", "urn:shared", "a");
    let b = module("b", "urn:shared", "b");

    match build_err(vec![("a", a), ("b", b)]) {
        BuildError::DuplicateNamespace { namespace, .. } => {
            assert_eq!(namespace, "urn:shared");
        }
        other => panic!("expected DuplicateNamespace, got {:?}", other),
    }
}

#[test]
fn duplicate_module_name_rejected() {
    let first = module("m", "urn:one", "m1");
    let second = module("m", "urn:two", "m2");

    match build_err(vec![("m1", first), ("m2", second)]) {
        BuildError::Collision { name, .. } => assert_eq!(name, "m"),
        other => panic!("expected Collision, got {:?}", other),
    }
}

#[test]
fn include_merges_submodule_content_into_module() {
    let m = module("m", "urn:m", "m").with(include("m-types"));
    let sub = submodule("m-types", "m", "m").with(container("cfg").with(leaf("x", "int32")));

    let model = build_ok(vec![("m", m), ("m-types", sub)]);
    assert_eq!(model.module_count(), 1);
    let cfg = model.find_schema_node("m", &["cfg"]).unwrap();
    assert_eq!(cfg.keyword, "container");
    // Submodule content belongs to the owning module's namespace.
    let qname = cfg.qname.as_ref().unwrap();
    assert_eq!(qname.module.namespace, XmlNamespace::of("urn:m"));
    assert!(model.find_schema_node("m", &["cfg", "x"]).is_some());
}

#[test]
fn submodule_groupings_visible_to_including_module() {
    let m = module("m", "urn:m", "m")
        .with(include("m-types"))
        .with(container("c").with(uses("g")));
    let sub = submodule("m-types", "m", "m").with(grouping("g").with(leaf("x", "string")));

    let model = build_ok(vec![("m", m), ("m-types", sub)]);
    assert!(model.find_schema_node("m", &["c", "x"]).is_some());
}

#[test]
fn submodule_may_include_a_sibling_submodule() {
    let m = module("m", "urn:m", "m").with(include("s1")).with(include("s2"));
    let s1 = submodule("s1", "m", "m")
        .with(include("s2"))
        .with(container("top").with(uses("g")));
    let s2 = submodule("s2", "m", "m").with(grouping("g").with(leaf("x", "string")));

    let model = build_ok(vec![("m", m), ("s1", s1), ("s2", s2)]);
    assert_eq!(model.module_count(), 1);
    assert!(model.find_schema_node("m", &["top", "x"]).is_some());
}

#[test]
fn circular_submodule_includes_are_rejected() {
    let m = module("m", "urn:m", "m").with(include("s1")).with(include("s2"));
    let s1 = submodule("s1", "m", "m").with(include("s2"));
    let s2 = submodule("s2", "m", "m").with(include("s1"));

    match build_err(vec![("m", m), ("s1", s1), ("s2", s2)]) {
        BuildError::Circular { cycle, .. } => {
            assert!(cycle.contains(&"s1".to_string()), "got: {:?}", cycle);
            assert!(cycle.contains(&"s2".to_string()), "got: {:?}", cycle);
        }
        other => panic!("expected Circular, got {:?}", other),
    }
}

#[test]
fn belongs_to_mismatch_is_an_error() {
    let m = module("m", "urn:m", "m").with(include("stray"));
    let sub = submodule("stray", "other", "o");

    match build_err(vec![("m", m), ("stray", sub)]) {
        BuildError::Syntax { message, .. } => {
            assert!(message.contains("belongs to module 'other'"), "got: {}", message);
        }
        other => panic!("expected Syntax, got {:?}", other),
    }
}

#[test]
fn import_with_revision_date_must_match() {
    let a = module("a", "urn:a", "a").with(IrStatement::new("revision", Some("2024-01-15")));
    let b = module("b", "urn:b", "b").with(
        IrStatement::new("import", Some("a"))
            .with(IrStatement::new("prefix", Some("a")))
            .with(IrStatement::new("revision-date", Some("2020-01-01"))),
    );

    match build_err(vec![("a", a), ("b", b)]) {
        BuildError::Unresolved(refs) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].keyword, "import");
        }
        other => panic!("expected Unresolved, got {:?}", other),
    }
}

#[test]
fn module_revision_is_latest_declared() {
    let m = module("m", "urn:m", "m")
        .with(IrStatement::new("revision", Some("2020-01-01")))
        .with(IrStatement::new("revision", Some("2024-06-30")));

    let model = build_ok(vec![("m", m)]);
    let latest = "2024-06-30".parse().unwrap();
    let qnm = QNameModule::new(XmlNamespace::of("urn:m"), Some(latest));
    assert!(model.find_module(&qnm).is_some());
}

#[test]
fn module_without_prefix_is_rejected() {
    let m = IrStatement::new("module", Some("m"))
        .with(IrStatement::new("namespace", Some("urn:m")));

    match build_err(vec![("m", m)]) {
        BuildError::Cardinality { message, .. } => {
            assert!(message.contains("prefix"), "got: {}", message);
        }
        other => panic!("expected Cardinality, got {:?}", other),
    }
}
