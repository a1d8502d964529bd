//! End-to-end parse/emit round-trip properties.

use modulemd::{ModuleIndex, ModuleStream};

const STREAM_V2: &str = r#"---
document: modulemd
version: 2
data:
  name: sssd
  stream: "1"
  summary: System Security Services Daemon
  description: Provides identity, authentication, and policy services.
  license:
    module:
    - MIT
...
"#;

const DEFAULTS_AND_TRANSLATION: &str = r#"---
document: modulemd-defaults
version: 1
data:
  module: sssd
  stream: "1"
  modified: 201807110500
...
---
document: modulemd-translations
version: 1
data:
  module: sssd
  stream: "1"
  modified: 201807110500
  translations:
    en_GB:
      summary: A translated summary
...
"#;

#[test]
fn stream_round_trips_through_index() {
    let mut index = ModuleIndex::new();
    let outcome = index.update_from_str(STREAM_V2, true).expect("stream-level parse failed");
    assert!(
        outcome.ok,
        "rejected subdocuments: {:?}",
        outcome.failures.iter().map(|f| f.error.to_string()).collect::<Vec<_>>()
    );

    let dumped = index.dump_to_string().expect("dump failed");

    let mut reparsed = ModuleIndex::new();
    let outcome = reparsed.update_from_str(&dumped, true).expect("re-parse of dumped output failed");
    assert!(outcome.ok);

    let module = index.get_module("sssd").unwrap();
    let reparsed_module = reparsed.get_module("sssd").unwrap();
    assert_eq!(
        module.streams().collect::<Vec<_>>(),
        reparsed_module.streams().collect::<Vec<_>>()
    );
}

#[test]
fn multi_document_stream_resolves_all_three_shapes() {
    let mut index = ModuleIndex::new();
    let outcome = index
        .update_from_str(DEFAULTS_AND_TRANSLATION, true)
        .expect("parse failed");
    assert!(outcome.ok, "{:?}", outcome.failures.iter().map(|f| f.error.to_string()).collect::<Vec<_>>());

    let module = index.get_module("sssd").unwrap();
    assert_eq!(module.defaults().unwrap().default_stream.as_deref(), Some("1"));
    assert_eq!(
        module
            .translation("1")
            .and_then(|t| t.translations.get("en_GB"))
            .and_then(|e| e.summary.as_deref()),
        Some("A translated summary")
    );
}

#[test]
fn emit_output_is_deterministic_across_runs() {
    let mut index = ModuleIndex::new();
    index.update_from_str(STREAM_V2, true).unwrap();
    let first = index.dump_to_string().unwrap();
    let second = index.dump_to_string().unwrap();
    assert_eq!(first, second);
}

#[test]
fn unknown_keys_are_rejected_only_in_strict_mode() {
    let source = STREAM_V2.replace("  license:", "  bogus_key: 1\n  license:");

    let mut strict_index = ModuleIndex::new();
    let outcome = strict_index.update_from_str(&source, true).unwrap();
    assert!(!outcome.ok);

    let mut lenient_index = ModuleIndex::new();
    let outcome = lenient_index.update_from_str(&source, false).unwrap();
    assert!(outcome.ok);
}

#[test]
fn missing_required_field_is_captured_as_a_subdocument_failure_not_a_stream_error() {
    let source = STREAM_V2.replace(
        "  license:\n    module:\n    - MIT\n",
        "",
    );
    let mut index = ModuleIndex::new();
    let outcome = index.update_from_str(&source, true).expect("stream-level parse should still succeed");
    assert!(!outcome.ok);
    assert_eq!(outcome.failures.len(), 1);
}

#[test]
fn read_from_bytes_overrides_names_for_the_packager_use_case() {
    let stream = ModuleStream::read_from_bytes(STREAM_V2.as_bytes(), true, Some("renamed"), Some("2"))
        .expect("read_from_bytes failed");
    assert_eq!(stream.module_name(), "renamed");
    assert_eq!(stream.stream_name(), "2");
}

#[test]
fn read_from_bytes_without_overrides_keeps_parsed_identity() {
    let stream =
        ModuleStream::read_from_bytes(STREAM_V2.as_bytes(), true, None, None).expect("read_from_bytes failed");
    assert_eq!(stream.module_name(), "sssd");
    assert_eq!(stream.stream_name(), "1");
}

#[test]
fn read_from_bytes_rejects_input_with_no_stream_document() {
    let result = ModuleStream::read_from_bytes(DEFAULTS_AND_TRANSLATION.as_bytes(), true, None, None);
    assert!(result.is_err());
}
