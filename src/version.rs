//! Process-wide configuration (spec §5): the single piece of shared mutable
//! state in the library, the default `ModuleStream` mdversion used when a
//! caller asks for "latest". Access is serialized through an `RwLock`,
//! matching the original's `modulemd_get/set_default_stream_mdversion`
//! (`modulemd.c`), which is documented there as expected to be set once at
//! startup.

use std::sync::{OnceLock, RwLock};

use crate::identity::StreamVersion;

fn lock() -> &'static RwLock<StreamVersion> {
    static DEFAULT_STREAM_MDVERSION: OnceLock<RwLock<StreamVersion>> = OnceLock::new();
    DEFAULT_STREAM_MDVERSION.get_or_init(|| RwLock::new(StreamVersion::V2))
}

/// The mdversion used for `ModuleStream`s constructed without an explicit
/// version, and as the "latest" target for `ModuleIndex` upgrades.
pub fn default_stream_mdversion() -> StreamVersion {
    *lock().read().expect("default_stream_mdversion lock poisoned")
}

/// Sets the process-wide default stream mdversion. Intended to be called
/// once at startup (spec §5).
pub fn set_default_stream_mdversion(version: StreamVersion) {
    *lock().write().expect("default_stream_mdversion lock poisoned") = version;
}

/// The library's semantic version, as reported to consumers needing a
/// version string (spec §6.3, "a version accessor").
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stream_mdversion_round_trips() {
        set_default_stream_mdversion(StreamVersion::V1);
        assert_eq!(default_stream_mdversion(), StreamVersion::V1);
        set_default_stream_mdversion(StreamVersion::V2);
        assert_eq!(default_stream_mdversion(), StreamVersion::V2);
    }

    #[test]
    fn version_is_nonempty() {
        assert!(!version().is_empty());
    }
}
