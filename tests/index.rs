//! `ModuleIndex` bookkeeping properties: version homogeneity, "update"
//! semantics for defaults/translations, sorted accessors (spec §4.3).

use modulemd::ModuleIndex;

#[test]
fn get_module_names_returns_modules_in_sorted_order() {
    let source = "\
---
document: modulemd
version: 2
data:
  name: zeta
  stream: \"1\"
  summary: s
  description: d
  license:
    module:
    - MIT
...
---
document: modulemd
version: 2
data:
  name: alpha
  stream: \"1\"
  summary: s
  description: d
  license:
    module:
    - MIT
...
";
    let mut index = ModuleIndex::new();
    index.update_from_str(source, true).unwrap();
    assert_eq!(index.get_module_names(), vec!["alpha", "zeta"]);
}

#[test]
fn defaults_update_keeps_only_the_newer_modified() {
    let newer = "\
---
document: modulemd-defaults
version: 1
data:
  module: sssd
  stream: \"2\"
  modified: 200
...
";
    let older = "\
---
document: modulemd-defaults
version: 1
data:
  module: sssd
  stream: \"1\"
  modified: 100
...
";
    let mut index = ModuleIndex::new();
    index.update_from_str(newer, true).unwrap();
    index.update_from_str(older, true).unwrap();

    assert_eq!(
        index.get_module("sssd").unwrap().defaults().unwrap().default_stream.as_deref(),
        Some("2")
    );
}

#[test]
fn translation_update_keeps_only_the_newer_modified_per_stream() {
    let newer = "\
---
document: modulemd-translations
version: 1
data:
  module: sssd
  stream: \"1\"
  modified: 200
  translations:
    en_GB:
      summary: newer summary
...
";
    let older = "\
---
document: modulemd-translations
version: 1
data:
  module: sssd
  stream: \"1\"
  modified: 100
  translations:
    en_GB:
      summary: older summary
...
";
    let mut index = ModuleIndex::new();
    index.update_from_str(newer, true).unwrap();
    index.update_from_str(older, true).unwrap();

    let translation = index.get_module("sssd").unwrap().translation("1").unwrap();
    assert_eq!(
        translation.translations.get("en_GB").and_then(|e| e.summary.as_deref()),
        Some("newer summary")
    );
}

#[test]
fn empty_index_has_no_modules() {
    let index = ModuleIndex::new();
    assert!(index.is_empty());
    assert!(index.get_module_names().is_empty());
}

#[test]
fn module_streams_by_name_are_sorted_by_version_descending() {
    let source = "\
---
document: modulemd
version: 2
data:
  name: nodejs
  stream: \"10\"
  version: 1
  summary: s
  description: d
  license:
    module:
    - MIT
...
---
document: modulemd
version: 2
data:
  name: nodejs
  stream: \"10\"
  version: 3
  summary: s
  description: d
  license:
    module:
    - MIT
...
---
document: modulemd
version: 2
data:
  name: nodejs
  stream: \"10\"
  version: 2
  summary: s
  description: d
  license:
    module:
    - MIT
...
";
    let mut index = ModuleIndex::new();
    index.update_from_str(source, true).unwrap();
    let module = index.get_module("nodejs").unwrap();

    let versions: Vec<u64> = module
        .streams_by_name("10")
        .iter()
        .map(|s| s.version())
        .collect();
    assert_eq!(versions, vec![3, 2, 1]);
    assert_eq!(module.all_streams().len(), 3);
    assert!(module.stream_by_nsvc("10", 2, "").is_some());
    assert!(module.stream_by_nsvc("10", 99, "").is_none());
}

#[test]
fn update_from_bytes_and_dump_to_bytes_round_trip() {
    let source = "\
---
document: modulemd-defaults
version: 1
data:
  module: httpd
  stream: \"2.6\"
...
";
    let mut index = ModuleIndex::new();
    let outcome = index.update_from_bytes(source.as_bytes(), true).unwrap();
    assert!(outcome.ok);

    let dumped = index.dump_to_bytes().unwrap();

    let mut reparsed = ModuleIndex::new();
    reparsed.update_from_bytes(&dumped, true).unwrap();
    assert_eq!(
        reparsed.get_module("httpd").unwrap().defaults().unwrap().default_stream.as_deref(),
        Some("2.6")
    );
}

#[test]
fn update_and_dump_via_io_streams() {
    let source = "\
---
document: modulemd-defaults
version: 1
data:
  module: httpd
  stream: \"2.6\"
...
";
    let mut index = ModuleIndex::new();
    let mut cursor = std::io::Cursor::new(source.as_bytes());
    let outcome = index.update_from_stream(&mut cursor, true).unwrap();
    assert!(outcome.ok);

    let mut sink = Vec::new();
    index.dump_to_stream(&mut sink).unwrap();
    assert!(!sink.is_empty());
}
