//! Integration test: layout report, catalog export, object audit and the
//! structured log round trip.
//!
//! Run: cargo test -p abiprobe-harness --test tooling_outputs_test

use abiprobe_harness::catalog_export::CatalogExport;
use abiprobe_harness::layout_report::LayoutReport;
use abiprobe_harness::object_audit::ObjectAudit;
use abiprobe_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, validate_log_file};

fn scratch(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("abiprobe-harness-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn layout_report_json_round_trips() {
    let report = LayoutReport::build();
    let json = report.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["digest"], report.digest);
    assert_eq!(parsed["layouts"].as_array().unwrap().len(), report.layouts.len());
    assert_eq!(parsed["target"]["pointer_width"], usize::BITS);
    let guid = report.row("Guid").expect("Guid layout");
    assert_eq!((guid.size, guid.align), (16, 4));
}

#[test]
fn catalog_interfaces_match_registry() {
    let export = CatalogExport::build();
    let registry = abiprobe_abi::catalog::registry();
    assert_eq!(export.interfaces.len(), registry.interfaces().len());
    let callback = export.interface("ICallback").unwrap();
    assert_eq!(callback.slots.len(), registry.slots("ICallback").len());
    assert_eq!(callback.iid, registry.interface("ICallback").unwrap().iid.to_string());
}

#[test]
fn object_audit_is_clean() {
    let audit = ObjectAudit::run();
    assert!(audit.passed(), "{:?}", audit.failures());
    let json: serde_json::Value = serde_json::from_str(&audit.to_json().unwrap()).unwrap();
    assert_eq!(json["created"], json["destroyed"]);
}

#[test]
fn emitted_log_validates() {
    let path = scratch("verify.log.jsonl");
    {
        let mut emitter = LogEmitter::to_file(&path, "fixture-verify", "run-test").unwrap();
        emitter.emit(LogLevel::Info, "verify_start").unwrap();
        emitter
            .emit_entry(
                LogEntry::new(String::new(), LogLevel::Error, "case_result")
                    .with_mode("hardened")
                    .with_symbol("Sum", "explicit-length")
                    .with_outcome(Outcome::Fail)
                    .with_violations(1),
            )
            .unwrap();
        emitter.flush().unwrap();
    }
    let (lines, errors) = validate_log_file(&path).unwrap();
    assert_eq!(lines, 2);
    assert!(errors.is_empty(), "{:?}", errors.iter().map(ToString::to_string).collect::<Vec<_>>());
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("fixture-verify::run-test::002"));
    let _ = std::fs::remove_file(path);
}
