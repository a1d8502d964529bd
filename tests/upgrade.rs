//! v1 -> v2 module stream upgrade properties (spec §4.2), exercised through
//! [`ModuleIndex`]'s version-homogeneity invariant (spec §4.3).

use modulemd::{ModuleIndex, ModuleStream, StreamVersion};

const STREAM_V1: &str = r#"---
document: modulemd
version: 1
data:
  name: sssd
  stream: "1"
  summary: System Security Services Daemon
  description: Provides identity, authentication, and policy services.
  license:
    module:
    - MIT
  dependencies:
    buildrequires:
      platform: f28
    requires:
      platform: f28
  eol: 2018-07-11
...
"#;

const STREAM_V2: &str = r#"---
document: modulemd
version: 2
data:
  name: sssd
  stream: "2"
  summary: System Security Services Daemon
  description: Provides identity, authentication, and policy services.
  license:
    module:
    - MIT
...
"#;

#[test]
fn v1_stream_upgrades_to_v2_carrying_dependencies_forward() {
    let mut index = ModuleIndex::new();
    let outcome = index.update_from_str(STREAM_V1, true).unwrap();
    assert!(outcome.ok, "{:?}", outcome.failures.iter().map(|f| f.error.to_string()).collect::<Vec<_>>());

    let module = index.get_module("sssd").unwrap();
    let stream = module.get_stream("1", 0, "").unwrap();
    assert_eq!(stream.mdversion(), StreamVersion::V1);

    let ModuleStream::V1(v1) = stream else {
        panic!("expected a v1 stream before any v2 is added");
    };
    assert!(v1.requires.contains_key("platform"));
}

#[test]
fn adding_a_v2_stream_upgrades_all_existing_v1_streams_in_the_module() {
    let mut index = ModuleIndex::new();
    index.update_from_str(STREAM_V1, true).unwrap();
    let outcome = index.update_from_str(STREAM_V2, true).unwrap();
    assert!(outcome.ok, "{:?}", outcome.failures.iter().map(|f| f.error.to_string()).collect::<Vec<_>>());

    let module = index.get_module("sssd").unwrap();
    assert_eq!(module.streams().count(), 2);
    assert!(module.streams().all(|s| s.mdversion() == StreamVersion::V2));

    let upgraded_v1 = module.get_stream("1", 0, "").unwrap();
    let ModuleStream::V2(v2) = upgraded_v1 else {
        panic!("stream `1` should have been upgraded to v2");
    };
    assert_eq!(v2.dependencies.len(), 1);
    assert_eq!(
        v2.dependencies[0].runtime.get("platform").map(|s| s.len()),
        Some(1)
    );
    assert_eq!(
        v2.service_levels.get("rawhide").and_then(|l| l.eol).map(|d| d.to_string()),
        Some("2018-07-11".to_owned())
    );
}

#[test]
fn downgrading_a_v2_stream_is_rejected() {
    let mut index = ModuleIndex::new();
    index.update_from_str(STREAM_V2, true).unwrap();
    let module = index.get_module("sssd").unwrap();
    let stream = module.get_stream("2", 0, "").unwrap();
    assert!(stream.upgrade(StreamVersion::V1).is_err());
}
