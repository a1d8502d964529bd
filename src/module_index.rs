//! In-memory aggregate of module documents, keyed by module name (spec
//! §4.3). A [`ModuleIndex`] is what one repository's metadata reads into;
//! an [`crate::IndexMerger`] combines several of these.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::document::{Defaults, ModuleStream, Translation};
use crate::identity::StreamVersion;
use crate::{Document, ModulemdError, SubdocumentInfo};

/// One module's aggregated streams, defaults, and translations.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct Module {
    pub module_name: String,
    streams: BTreeMap<(String, u64, String), ModuleStream>,
    defaults: Option<Defaults>,
    translations: BTreeMap<String, Translation>,
}

impl Module {
    fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Default::default()
        }
    }

    /// Streams in `(stream, version, context)` order.
    pub fn streams(&self) -> impl Iterator<Item = &ModuleStream> {
        self.streams.values()
    }

    /// All streams belonging to this module, in no particular order beyond
    /// `(stream, version, context)` (spec §6.2 `Module::all_streams`).
    pub fn all_streams(&self) -> Vec<&ModuleStream> {
        self.streams.values().collect()
    }

    /// Streams named `stream`, sorted by version descending (spec §6.2
    /// `Module::streams_by_name`).
    pub fn streams_by_name(&self, stream: &str) -> Vec<&ModuleStream> {
        let mut matches: Vec<&ModuleStream> = self
            .streams
            .iter()
            .filter(|((s, _, _), _)| s == stream)
            .map(|(_, v)| v)
            .collect();
        matches.sort_by(|a, b| b.version().cmp(&a.version()));
        matches
    }

    /// Looks up a stream by its full `(N:S:V:C)` identity (spec §6.2
    /// `Module::stream_by_nsvc`); `self.module_name` supplies `N` implicitly.
    pub fn stream_by_nsvc(&self, stream: &str, version: u64, context: &str) -> Option<&ModuleStream> {
        self.streams
            .get(&(stream.to_owned(), version, context.to_owned()))
    }

    pub fn get_stream(&self, stream: &str, version: u64, context: &str) -> Option<&ModuleStream> {
        self.stream_by_nsvc(stream, version, context)
    }

    pub fn defaults(&self) -> Option<&Defaults> {
        self.defaults.as_ref()
    }

    pub fn translation(&self, stream: &str) -> Option<&Translation> {
        self.translations.get(stream)
    }

    pub fn translations(&self) -> impl Iterator<Item = (&str, &Translation)> {
        self.translations.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn upgrade_streams_to(&mut self, target: StreamVersion) -> Result<(), ModulemdError> {
        let upgraded = self
            .streams
            .values()
            .map(|s| s.upgrade(target))
            .collect::<Result<Vec<_>, _>>()?;
        self.streams = upgraded
            .into_iter()
            .map(|s| {
                (
                    (s.stream_name().to_owned(), s.version(), s.context().to_owned()),
                    s,
                )
            })
            .collect();
        Ok(())
    }
}

/// Outcome of [`ModuleIndex::update_from_str`]: `ok` is false iff any
/// subdocument was rejected (spec §4.3 `update_from`).
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct UpdateOutcome {
    pub ok: bool,
    pub failures: Vec<SubdocumentInfo>,
}

/// Keyed collection of per-module aggregates; enforces version homogeneity
/// via auto-upgrade on insertion (spec §4.3).
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct ModuleIndex {
    modules: BTreeMap<String, Module>,
    /// The highest stream mdversion seen across the whole index (spec §3,
    /// §4.3): every stream in every module is kept at this version.
    stream_mdversion: Option<StreamVersion>,
}

impl ModuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Module names, ascending (spec §4.3).
    pub fn get_module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Parses `source` via the codec and folds every resulting document into
    /// this index through the matching `add_*` method (spec §4.3
    /// `update_from`).
    pub fn update_from_str(&mut self, source: &str, strict: bool) -> Result<UpdateOutcome, ModulemdError> {
        let outcome = crate::codec::parse(source, strict)?;
        let mut failures = outcome.failures;

        for doc in outcome.documents {
            let kind = doc.kind();
            let result = match doc {
                Document::Stream(s) => self.add_module_stream(s),
                Document::Defaults(d) => self.add_defaults(d),
                Document::Translation(t) => self.add_translation(t),
            };
            if let Err(error) = result {
                warn!(document = kind, %error, "rejecting parsed document during index update");
                failures.push(SubdocumentInfo::new(String::new(), error));
            }
        }

        let ok = failures.is_empty();
        debug!(modules = self.modules.len(), ok, "updated index from source");
        Ok(UpdateOutcome { ok, failures })
    }

    /// Adds a module stream, upgrading it (or every existing stream in the
    /// index) as needed to restore version homogeneity across the whole
    /// index, not just the module being inserted into (spec §3, §4.3: "if
    /// the index's current stream-mdversion is lower than s's, all existing
    /// streams are upgraded to s's version first").
    pub fn add_module_stream(&mut self, stream: ModuleStream) -> Result<(), ModulemdError> {
        if stream.module_name().is_empty() {
            return Err(ModulemdError::missing_field("<stream>", "name"));
        }
        if stream.stream_name().is_empty() {
            return Err(ModulemdError::missing_field("<stream>", "stream"));
        }
        stream.validate()?;

        let mut stream = stream;
        let target = match self.stream_mdversion {
            Some(existing) if existing >= stream.mdversion() => existing,
            _ => stream.mdversion(),
        };

        if self.stream_mdversion != Some(target) {
            trace!(?target, "upgrading every module's streams to match the index's new mdversion");
            for module in self.modules.values_mut() {
                module.upgrade_streams_to(target)?;
            }
            self.stream_mdversion = Some(target);
        }

        if stream.mdversion() < target {
            stream = stream.upgrade(target)?;
        }

        let module = self
            .modules
            .entry(stream.module_name().to_owned())
            .or_insert_with(|| Module::new(stream.module_name()));

        let key = (
            stream.stream_name().to_owned(),
            stream.version(),
            stream.context().to_owned(),
        );
        module.streams.insert(key, stream);
        Ok(())
    }

    /// Adds defaults for a module; the incoming document replaces any
    /// existing one only if strictly newer (spec §4.3 `add_defaults`).
    pub fn add_defaults(&mut self, defaults: Defaults) -> Result<(), ModulemdError> {
        if defaults.module_name.is_empty() {
            return Err(ModulemdError::missing_field("<defaults>", "module"));
        }
        defaults.validate()?;

        let module = self
            .modules
            .entry(defaults.module_name.clone())
            .or_insert_with(|| Module::new(defaults.module_name.clone()));

        match &module.defaults {
            Some(existing) if existing.modified >= defaults.modified => {
                trace!(module = %defaults.module_name, "dropping defaults not newer than existing");
            }
            _ => module.defaults = Some(defaults),
        }
        Ok(())
    }

    /// Adds a translation for `(module, stream)`; replaces any existing
    /// entry only if strictly newer (spec §4.3 `add_translation`).
    pub fn add_translation(&mut self, translation: Translation) -> Result<(), ModulemdError> {
        if translation.module_name.is_empty() {
            return Err(ModulemdError::missing_field("<translation>", "module"));
        }
        translation.validate()?;

        let module = self
            .modules
            .entry(translation.module_name.clone())
            .or_insert_with(|| Module::new(translation.module_name.clone()));

        match module.translations.get(&translation.stream_name) {
            Some(existing) if existing.modified >= translation.modified => {
                trace!(
                    module = %translation.module_name,
                    stream = %translation.stream_name,
                    "dropping translation not newer than existing"
                );
            }
            _ => {
                module
                    .translations
                    .insert(translation.stream_name.clone(), translation);
            }
        }
        Ok(())
    }

    /// Unconditionally installs `defaults` for its module, bypassing the
    /// "only if newer" rule of [`Self::add_defaults`]. Used by
    /// [`crate::IndexMerger`], which has already decided the winning value.
    pub(crate) fn force_set_defaults(&mut self, defaults: Defaults) -> Result<(), ModulemdError> {
        defaults.validate()?;
        let module = self
            .modules
            .entry(defaults.module_name.clone())
            .or_insert_with(|| Module::new(defaults.module_name.clone()));
        module.defaults = Some(defaults);
        Ok(())
    }

    /// Unconditionally installs `translation`, bypassing the "only if newer"
    /// rule of [`Self::add_translation`]. Used by [`crate::IndexMerger`].
    pub(crate) fn force_set_translation(&mut self, translation: Translation) -> Result<(), ModulemdError> {
        translation.validate()?;
        let module = self
            .modules
            .entry(translation.module_name.clone())
            .or_insert_with(|| Module::new(translation.module_name.clone()));
        module
            .translations
            .insert(translation.stream_name.clone(), translation);
        Ok(())
    }

    /// Like [`Self::update_from_str`], but takes raw bytes (spec §6.2
    /// `Index::update_from_bytes`); the input must be valid UTF-8.
    pub fn update_from_bytes(&mut self, bytes: &[u8], strict: bool) -> Result<UpdateOutcome, ModulemdError> {
        let source = std::str::from_utf8(bytes).map_err(|e| {
            ModulemdError::new(
                crate::ErrorKind::YamlOpen,
                format!("input is not valid UTF-8: {e}"),
            )
        })?;
        self.update_from_str(source, strict)
    }

    /// Like [`Self::update_from_bytes`], but reads the complete stream from
    /// `source` first (spec §6.2 `Index::update_from_stream`). Blocking
    /// behavior is inherited entirely from `source` (spec §5).
    pub fn update_from_stream<R: std::io::Read>(
        &mut self,
        source: &mut R,
        strict: bool,
    ) -> Result<UpdateOutcome, ModulemdError> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| ModulemdError::new(crate::ErrorKind::YamlOpen, e.to_string()))?;
        self.update_from_bytes(&bytes, strict)
    }

    /// Emits every document in this index as one YAML stream, in
    /// modules-sorted-by-name order, and within each module: defaults, then
    /// streams sorted by `(S, V, C)`, then translations sorted by stream
    /// (spec §4.3 `dump`).
    pub fn dump_to_string(&self) -> Result<String, ModulemdError> {
        let mut documents = Vec::new();
        for module in self.modules.values() {
            if let Some(defaults) = &module.defaults {
                documents.push(Document::Defaults(defaults.clone()));
            }
            for stream in module.streams.values() {
                documents.push(Document::Stream(stream.clone()));
            }
            for translation in module.translations.values() {
                documents.push(Document::Translation(translation.clone()));
            }
        }
        Ok(crate::codec::emit(&documents)?)
    }

    /// Like [`Self::dump_to_string`], as owned bytes (spec §6.2
    /// `Index::dump_to_bytes`).
    pub fn dump_to_bytes(&self) -> Result<Vec<u8>, ModulemdError> {
        Ok(self.dump_to_string()?.into_bytes())
    }

    /// Like [`Self::dump_to_bytes`], written directly to `sink` (spec §6.2
    /// `Index::dump_to_stream`). Blocking behavior is inherited entirely
    /// from `sink` (spec §5).
    pub fn dump_to_stream<W: std::io::Write>(&self, sink: &mut W) -> Result<(), ModulemdError> {
        let bytes = self.dump_to_bytes()?;
        sink.write_all(&bytes)
            .map_err(|e| ModulemdError::new(crate::ErrorKind::YamlEmit, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StreamV1;
    use std::collections::BTreeSet;

    fn stream(name: &str, stream: &str, version: u64) -> ModuleStream {
        let mut s = StreamV1::new();
        s.name = name.to_owned();
        s.stream = stream.to_owned();
        s.version = version;
        s.summary = "summary".to_owned();
        s.description = "description".to_owned();
        s.module_licenses = BTreeSet::from(["MIT".to_owned()]);
        ModuleStream::V1(s)
    }

    #[test]
    fn add_module_stream_requires_name_and_stream() {
        let mut index = ModuleIndex::new();
        let mut s = StreamV1::new();
        s.module_licenses = BTreeSet::from(["MIT".to_owned()]);
        s.description = "d".to_owned();
        assert!(index.add_module_stream(ModuleStream::V1(s)).is_err());
    }

    fn stream_v2_sample() -> crate::document::StreamV2 {
        let mut s = crate::document::StreamV2::new();
        s.stream = "2".to_owned();
        s.version = 1;
        s.summary = "summary".to_owned();
        s.description = "description".to_owned();
        s.module_licenses = BTreeSet::from(["MIT".to_owned()]);
        s
    }

    #[test]
    fn add_module_stream_upgrades_existing_on_v2_insert() {
        let mut index = ModuleIndex::new();
        index.add_module_stream(stream("foo", "1", 1)).unwrap();
        let mut v2 = stream_v2_sample();
        v2.name = "foo".to_owned();
        index.add_module_stream(ModuleStream::V2(v2)).unwrap();
        let module = index.get_module("foo").unwrap();
        assert!(module.streams().all(|s| s.mdversion() == StreamVersion::V2));
    }

    #[test]
    fn add_module_stream_upgrades_every_module_in_the_index_not_just_the_one_inserted_into() {
        let mut index = ModuleIndex::new();
        index.add_module_stream(stream("foo", "1", 1)).unwrap();
        let mut v2 = stream_v2_sample();
        v2.name = "bar".to_owned();
        index.add_module_stream(ModuleStream::V2(v2)).unwrap();

        let foo = index.get_module("foo").unwrap();
        assert!(foo.streams().all(|s| s.mdversion() == StreamVersion::V2));
        let bar = index.get_module("bar").unwrap();
        assert!(bar.streams().all(|s| s.mdversion() == StreamVersion::V2));
    }

    #[test]
    fn add_defaults_keeps_newer_modified() {
        let mut index = ModuleIndex::new();
        let mut older = Defaults::new("foo");
        older.modified = 1;
        let mut newer = Defaults::new("foo");
        newer.modified = 2;
        newer.default_stream = Some("2".to_owned());

        index.add_defaults(newer.clone()).unwrap();
        index.add_defaults(older).unwrap();

        assert_eq!(index.get_module("foo").unwrap().defaults(), Some(&newer));
    }

    #[test]
    fn get_module_names_are_sorted() {
        let mut index = ModuleIndex::new();
        index.add_module_stream(stream("zeta", "1", 1)).unwrap();
        index.add_module_stream(stream("alpha", "1", 1)).unwrap();
        assert_eq!(index.get_module_names(), vec!["alpha", "zeta"]);
    }
}
