//! Priority-based combination of several [`ModuleIndex`]es into one (spec
//! §4.4).

use std::collections::BTreeMap;

use tracing::debug;

use crate::document::{Defaults, Intent, Translation};
use crate::module_index::ModuleIndex;
use crate::{ErrorKind, ModulemdError};

/// Combines indexes associated at priorities `0..=1000` (higher wins) into
/// one resolved index (spec §4.4).
///
/// `resolve` borrows every associated index for its duration; the merger's
/// state is meaningless afterward and callers should discard it.
#[derive(Default)]
#[non_exhaustive]
pub struct IndexMerger<'a> {
    buckets: BTreeMap<u16, Vec<&'a ModuleIndex>>,
}

impl<'a> IndexMerger<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `index` at `priority` (0..=1000, higher is more
    /// important). Fails with [`ErrorKind::PriorityOutOfRange`] otherwise.
    pub fn associate_index(&mut self, index: &'a ModuleIndex, priority: u16) -> Result<(), ModulemdError> {
        if priority > 1000 {
            return Err(ModulemdError::new(
                ErrorKind::PriorityOutOfRange,
                format!("priority {priority} is outside the allowed range 0..=1000"),
            ));
        }
        self.buckets.entry(priority).or_default().push(index);
        Ok(())
    }

    /// Resolves every associated index into one, following the ascending
    /// priority-bucket algorithm of spec §4.4.
    pub fn resolve(&self, strict_defaults: bool) -> Result<ModuleIndex, ModulemdError> {
        if self.buckets.is_empty() {
            return Err(ModulemdError::new(
                ErrorKind::NothingToResolve,
                "no indexes were associated with this merger",
            ));
        }

        let mut final_index = ModuleIndex::new();
        for (priority, indexes) in &self.buckets {
            let mut level = ModuleIndex::new();
            for index in indexes {
                merge_index(&mut level, index, false, strict_defaults)?;
            }
            debug!(priority, modules = level.get_module_names().len(), "merged priority level");
            merge_index(&mut final_index, &level, true, strict_defaults)?;
        }
        Ok(final_index)
    }
}

/// Merges every module of `src` into `dest` (spec §4.4 pairwise merge).
fn merge_index(
    dest: &mut ModuleIndex,
    src: &ModuleIndex,
    override_: bool,
    strict_defaults: bool,
) -> Result<(), ModulemdError> {
    for name in src.get_module_names() {
        let src_module = src.get_module(name).expect("name came from get_module_names");

        for stream in src_module.streams() {
            let already_present = dest
                .get_module(name)
                .and_then(|m| m.get_stream(stream.stream_name(), stream.version(), stream.context()))
                .is_some();
            if !already_present {
                dest.add_module_stream(stream.clone())?;
            }
        }

        if let Some(src_defaults) = src_module.defaults() {
            let dest_defaults = dest.get_module(name).and_then(|m| m.defaults()).cloned();
            let resolved = match dest_defaults {
                None => src_defaults.clone(),
                Some(a) => merge_defaults(&a, src_defaults, override_, strict_defaults)?,
            };
            dest.force_set_defaults(resolved)?;
        }

        for (stream, src_translation) in src_module.translations() {
            let dest_translation = dest
                .get_module(name)
                .and_then(|m| m.translation(stream))
                .cloned();
            let resolved = match dest_translation {
                None => src_translation.clone(),
                Some(a) => merge_translation(&a, src_translation),
            };
            dest.force_set_translation(resolved)?;
        }
    }
    Ok(())
}

/// Structural defaults merge for two documents with equal `modified` (spec
/// §4.4). Callers have already established `a.modified == b.modified`;
/// when they differ the newer one is taken outright instead.
fn merge_defaults(
    a: &Defaults,
    b: &Defaults,
    override_: bool,
    strict_defaults: bool,
) -> Result<Defaults, ModulemdError> {
    if a.modified > b.modified {
        return Ok(a.clone());
    }
    if b.modified > a.modified {
        return Ok(b.clone());
    }

    let mut merged = a.clone();
    merged.default_stream = merge_default_stream(
        &a.module_name,
        &a.default_stream,
        &b.default_stream,
        override_,
        strict_defaults,
    )?;
    merged.profile_defaults = merge_profile_defaults(
        &a.module_name,
        &a.profile_defaults,
        &b.profile_defaults,
        override_,
        strict_defaults,
    )?;

    let mut intents = a.intents.clone();
    for (name, b_intent) in &b.intents {
        let path = format!("{}.intents.{name}", a.module_name);
        let merged_intent = match intents.get(name) {
            None => b_intent.clone(),
            Some(a_intent) => Intent {
                default_stream: merge_default_stream(
                    &path,
                    &a_intent.default_stream,
                    &b_intent.default_stream,
                    override_,
                    strict_defaults,
                )?,
                profile_defaults: merge_profile_defaults(
                    &path,
                    &a_intent.profile_defaults,
                    &b_intent.profile_defaults,
                    override_,
                    strict_defaults,
                )?,
            },
        };
        intents.insert(name.clone(), merged_intent);
    }
    merged.intents = intents;

    Ok(merged)
}

fn merge_default_stream(
    path: &str,
    a: &Option<String>,
    b: &Option<String>,
    override_: bool,
    strict_defaults: bool,
) -> Result<Option<String>, ModulemdError> {
    match (a, b) {
        (None, None) => Ok(None),
        (Some(x), None) => Ok(Some(x.clone())),
        (None, Some(y)) => Ok(Some(y.clone())),
        (Some(x), Some(y)) if x == y => Ok(Some(x.clone())),
        (Some(_), Some(y)) => {
            if !override_ || strict_defaults {
                Err(ModulemdError::new(
                    ErrorKind::MergeConflictDefaults,
                    format!("{path}: conflicting default_stream"),
                ))
            } else {
                Ok(Some(y.clone()))
            }
        }
    }
}

fn merge_profile_defaults(
    path: &str,
    a: &BTreeMap<String, std::collections::BTreeSet<String>>,
    b: &BTreeMap<String, std::collections::BTreeSet<String>>,
    override_: bool,
    strict_defaults: bool,
) -> Result<BTreeMap<String, std::collections::BTreeSet<String>>, ModulemdError> {
    let mut result = a.clone();
    for (stream, b_set) in b {
        match result.get(stream) {
            None => {
                result.insert(stream.clone(), b_set.clone());
            }
            Some(a_set) if a_set == b_set => {}
            Some(_) => {
                if !override_ || strict_defaults {
                    return Err(ModulemdError::new(
                        ErrorKind::MergeConflictDefaults,
                        format!("{path}: conflicting profile defaults for stream `{stream}`"),
                    ));
                }
                result.insert(stream.clone(), b_set.clone());
            }
        }
    }
    Ok(result)
}

/// Translation merge: the side with the larger `modified` wins outright;
/// ties keep the destination (spec §4.4).
fn merge_translation(a: &Translation, b: &Translation) -> Translation {
    if a.modified >= b.modified {
        a.clone()
    } else {
        b.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StreamV1;
    use crate::ModuleStream;
    use std::collections::BTreeSet;

    fn index_with_stream(name: &str, stream_name: &str) -> ModuleIndex {
        let mut index = ModuleIndex::new();
        let mut s = StreamV1::new();
        s.name = name.to_owned();
        s.stream = stream_name.to_owned();
        s.summary = "summary".to_owned();
        s.description = "description".to_owned();
        s.module_licenses = BTreeSet::from(["MIT".to_owned()]);
        index.add_module_stream(ModuleStream::V1(s)).unwrap();
        index
    }

    #[test]
    fn priority_out_of_range_is_rejected() {
        let index = index_with_stream("foo", "1");
        let mut merger = IndexMerger::new();
        assert!(merger.associate_index(&index, 1001).is_err());
    }

    #[test]
    fn resolve_with_nothing_associated_fails() {
        let merger = IndexMerger::new();
        assert!(merger.resolve(false).is_err());
    }

    #[test]
    fn higher_priority_defaults_win() {
        let mut low = ModuleIndex::new();
        let mut low_defaults = Defaults::new("foo");
        low_defaults.modified = 1;
        low_defaults.default_stream = Some("1".to_owned());
        low.add_defaults(low_defaults).unwrap();

        let mut high = ModuleIndex::new();
        let mut high_defaults = Defaults::new("foo");
        high_defaults.modified = 1;
        high_defaults.default_stream = Some("2".to_owned());
        high.add_defaults(high_defaults).unwrap();

        let mut merger = IndexMerger::new();
        merger.associate_index(&low, 0).unwrap();
        merger.associate_index(&high, 10).unwrap();

        let resolved = merger.resolve(false).unwrap();
        assert_eq!(
            resolved.get_module("foo").unwrap().defaults().unwrap().default_stream,
            Some("2".to_owned())
        );
    }

    #[test]
    fn strict_defaults_rejects_equal_modified_conflict_even_with_override() {
        let mut low = ModuleIndex::new();
        let mut a = Defaults::new("foo");
        a.modified = 1;
        a.default_stream = Some("1".to_owned());
        low.add_defaults(a).unwrap();

        let mut high = ModuleIndex::new();
        let mut b = Defaults::new("foo");
        b.modified = 1;
        b.default_stream = Some("2".to_owned());
        high.add_defaults(b).unwrap();

        let mut merger = IndexMerger::new();
        merger.associate_index(&low, 0).unwrap();
        merger.associate_index(&high, 0).unwrap();

        assert!(merger.resolve(true).is_err());
    }

    #[test]
    fn streams_at_same_identity_are_deduplicated() {
        let a = index_with_stream("foo", "1");
        let b = index_with_stream("foo", "1");
        let mut merger = IndexMerger::new();
        merger.associate_index(&a, 0).unwrap();
        merger.associate_index(&b, 0).unwrap();

        let resolved = merger.resolve(false).unwrap();
        assert_eq!(resolved.get_module("foo").unwrap().streams().count(), 1);
    }
}
