//! Priority-based index merging properties (spec §4.4).

use modulemd::{IndexMerger, ModuleIndex};

fn defaults_doc(stream: &str, modified: u64) -> String {
    format!(
        "---\ndocument: modulemd-defaults\nversion: 1\ndata:\n  module: sssd\n  stream: \"{stream}\"\n  modified: {modified}\n...\n"
    )
}

fn stream_doc(stream: &str) -> String {
    format!(
        "---\ndocument: modulemd\nversion: 2\ndata:\n  name: sssd\n  stream: \"{stream}\"\n  summary: s\n  description: d\n  license:\n    module:\n    - MIT\n...\n"
    )
}

#[test]
fn higher_priority_index_wins_on_equal_modified_defaults_conflict() {
    let mut low = ModuleIndex::new();
    low.update_from_str(&defaults_doc("1", 100), true).unwrap();

    let mut high = ModuleIndex::new();
    high.update_from_str(&defaults_doc("2", 100), true).unwrap();

    let mut merger = IndexMerger::new();
    merger.associate_index(&low, 0).unwrap();
    merger.associate_index(&high, 100).unwrap();

    let resolved = merger.resolve(false).unwrap();
    assert_eq!(
        resolved.get_module("sssd").unwrap().defaults().unwrap().default_stream.as_deref(),
        Some("2")
    );
}

#[test]
fn strict_defaults_mode_rejects_same_priority_conflicts() {
    let mut a = ModuleIndex::new();
    a.update_from_str(&defaults_doc("1", 100), true).unwrap();
    let mut b = ModuleIndex::new();
    b.update_from_str(&defaults_doc("2", 100), true).unwrap();

    let mut merger = IndexMerger::new();
    merger.associate_index(&a, 50).unwrap();
    merger.associate_index(&b, 50).unwrap();

    assert!(merger.resolve(true).is_err());
    assert!(merger.resolve(false).is_ok());
}

#[test]
fn streams_from_different_sources_are_unioned_not_overwritten() {
    let mut a = ModuleIndex::new();
    a.update_from_str(&stream_doc("1"), true).unwrap();
    let mut b = ModuleIndex::new();
    b.update_from_str(&stream_doc("2"), true).unwrap();

    let mut merger = IndexMerger::new();
    merger.associate_index(&a, 0).unwrap();
    merger.associate_index(&b, 10).unwrap();

    let resolved = merger.resolve(false).unwrap();
    assert_eq!(resolved.get_module("sssd").unwrap().streams().count(), 2);
}

#[test]
fn priority_must_be_within_range() {
    let index = ModuleIndex::new();
    let mut merger = IndexMerger::new();
    assert!(merger.associate_index(&index, 1000).is_ok());
    assert!(merger.associate_index(&index, 1001).is_err());
}

#[test]
fn resolving_an_empty_merger_fails() {
    let merger = IndexMerger::new();
    assert!(merger.resolve(false).is_err());
}
