//! Frozen model shape: lookups, retained definitions, stable export.

use yangc_compiler::compiler::ir::IrStatement;
use yangc_compiler::compiler::testing_helpers::*;
use yangc_core::{QNameModule, XmlNamespace};

fn sample() -> Vec<(&'static str, IrStatement)> {
    let lib = module("lib", "urn:lib", "lib")
        .with(IrStatement::new("revision", Some("2024-03-01")))
        .with(grouping("addr").with(leaf("ip", "string")).with(leaf("port", "int32")))
        .with(identity("proto"))
        .with(identity("tcp").with(IrStatement::new("base", Some("proto"))));
    let app = module("app", "urn:app", "app")
        .with(import("lib", "l"))
        .with(container("server").with(uses("l:addr")))
        .with(augment("/server").with(leaf("name", "string")));
    vec![("lib", lib), ("app", app)]
}

#[test]
fn model_export_is_deterministic() {
    let first = build_ok(sample()).export_json().unwrap();
    let second = build_ok(sample()).export_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn expansion_machinery_is_absent_from_frozen_tree() {
    let model = build_ok(sample());
    let app = model.find_module_by_name("app").unwrap();
    assert!(app.substatements.iter().all(|s| s.keyword != "augment"));
    let server = model.find_schema_node("app", &["server"]).unwrap();
    assert!(server.substatements.iter().all(|s| s.keyword != "uses"));
    assert!(model.find_schema_node("app", &["server", "ip"]).is_some());
    assert!(model.find_schema_node("app", &["server", "name"]).is_some());
}

#[test]
fn grouping_definitions_survive_freezing() {
    let model = build_ok(sample());
    let lib = model.find_module_by_name("lib").unwrap();
    let addr = lib.find("grouping").unwrap();
    assert_eq!(addr.argument_str().as_deref(), Some("addr"));
    assert_eq!(addr.find_all("leaf").count(), 2);
}

#[test]
fn prefix_indices_are_computed_at_assembly() {
    let model = build_ok(sample());
    let lib = model.find_module_by_prefix("lib").unwrap();
    assert_eq!(lib.argument_str().as_deref(), Some("lib"));

    let qnm = lib.qname.as_ref().unwrap().module.clone();
    assert_eq!(model.preferred_prefix(&qnm), Some("lib"));
    assert!(model.find_module_by_prefix("nope").is_none());
}

#[test]
fn module_identity_carries_latest_revision() {
    let model = build_ok(sample());
    let latest = "2024-03-01".parse().unwrap();
    let qnm = QNameModule::new(XmlNamespace::of("urn:lib"), Some(latest));
    assert!(model.find_module(&qnm).is_some());

    let (found, _) = model.modules().find(|(q, _)| **q == qnm).unwrap();
    assert_eq!(found.revision, Some(latest));
}

#[test]
fn identities_are_qualified_by_their_module() {
    let model = build_ok(sample());
    let lib = model.find_module_by_name("lib").unwrap();
    let tcp = lib
        .substatements
        .iter()
        .find(|s| s.keyword == "identity" && s.argument_str().as_deref() == Some("tcp"))
        .unwrap();
    let qname = tcp.qname.as_ref().unwrap();
    assert_eq!(qname.local_name(), "tcp");
    assert_eq!(qname.module.namespace, XmlNamespace::of("urn:lib"));
}

#[test]
fn missing_lookups_return_none() {
    let model = build_ok(sample());
    assert!(model.find_module_by_name("nope").is_none());
    assert!(model.find_schema_node("app", &["server", "nope"]).is_none());
    assert!(model.find_schema_node("nope", &["server"]).is_none());
}

#[test]
fn export_json_contains_every_module() {
    let model = build_ok(sample());
    let json = model.export_json().unwrap();
    assert!(json.contains("urn:lib"), "got: {}", json);
    assert!(json.contains("urn:app"), "got: {}", json);
    assert!(json.contains("\"keyword\""), "got: {}", json);
}
