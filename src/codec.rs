//! The multi-document YAML codec (spec §4.1): an event-driven parser and
//! emitter for the `modulemd` / `modulemd-defaults` / `modulemd-translations`
//! document set, with per-subdocument error isolation.
//!
//! Each subdocument's root mapping is first materialized into a [`RawNode`]
//! tree (rather than walked as a flat event stream) so that the
//! `document`/`version`/`data` keys can be read in whatever order they
//! appear, and so each document type's parser (in [`crate::document`]) can
//! be written as ordinary recursive descent over an already-parsed value
//! instead of a hand-rolled event-stack walk.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::{
    Document, Emitter, Event, EventData, Mark, ModulemdError, Parser, ScalarStyle, SubdocumentInfo,
    YamlError,
};

/// A materialized YAML value for one subdocument, with source positions
/// kept so validation errors and `strict`-mode rejections can name a key
/// path.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RawNode {
    Scalar(String, Mark),
    Sequence(Vec<RawNode>, Mark),
    Mapping(Vec<(String, RawNode)>, Mark),
}

impl RawNode {
    pub(crate) fn mark(&self) -> Mark {
        match self {
            RawNode::Scalar(_, m) | RawNode::Sequence(_, m) | RawNode::Mapping(_, m) => *m,
        }
    }

    pub(crate) fn as_scalar(&self, path: &str) -> Result<&str, ModulemdError> {
        match self {
            RawNode::Scalar(s, _) => Ok(s),
            _ => Err(ModulemdError::invalid_value(path, "expected a scalar")),
        }
    }

    pub(crate) fn as_sequence(&self, path: &str) -> Result<&[RawNode], ModulemdError> {
        match self {
            RawNode::Sequence(items, _) => Ok(items),
            _ => Err(ModulemdError::invalid_value(path, "expected a sequence")),
        }
    }

    pub(crate) fn as_mapping(&self, path: &str) -> Result<&[(String, RawNode)], ModulemdError> {
        match self {
            RawNode::Mapping(pairs, _) => Ok(pairs),
            _ => Err(ModulemdError::invalid_value(path, "expected a mapping")),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&RawNode> {
        match self {
            RawNode::Mapping(pairs, _) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Parses a `u64` scalar. `0` is reserved as "unset" for version fields
    /// (spec §4.1.2).
    pub(crate) fn as_u64(&self, path: &str) -> Result<u64, ModulemdError> {
        self.as_scalar(path)?
            .parse::<u64>()
            .map_err(|_| ModulemdError::invalid_value(path, "expected an unsigned integer"))
    }

    /// Parses a `YYYY-MM-DD` date (spec §4.1.2 "dates").
    pub(crate) fn as_date(&self, path: &str) -> Result<chrono::NaiveDate, ModulemdError> {
        chrono::NaiveDate::parse_from_str(self.as_scalar(path)?, "%Y-%m-%d")
            .map_err(|e| ModulemdError::invalid_value(path, format!("invalid date: {e}")))
    }

    /// Rejects (strict) or silently drops (non-strict) any key of this
    /// mapping not named in `known` (spec §4.1.2 "strict").
    pub(crate) fn check_known_keys(
        &self,
        path: &str,
        known: &[&str],
        strict: bool,
    ) -> Result<(), ModulemdError> {
        let RawNode::Mapping(pairs, _) = self else {
            return Ok(());
        };
        for (key, _) in pairs {
            if !known.contains(&key.as_str()) {
                if strict {
                    return Err(ModulemdError::unknown_key(path, key));
                }
                warn!(%path, key, "skipping unknown key (non-strict mode)");
            }
        }
        Ok(())
    }
}

/// Consumes one complete value (scalar, sequence, or mapping) from `parser`,
/// given that `first` is the event that opens it.
fn read_node(parser: &mut Parser, first: Event) -> Result<RawNode, YamlError> {
    match first.data {
        EventData::Scalar { value, .. } => Ok(RawNode::Scalar(value, first.start_mark)),
        EventData::SequenceStart { .. } => {
            let mut items = Vec::new();
            loop {
                let event = parser.parse().map_err(YamlError::Parse)?;
                if matches!(event.data, EventData::SequenceEnd) {
                    return Ok(RawNode::Sequence(items, first.start_mark));
                }
                items.push(read_node(parser, event)?);
            }
        }
        EventData::MappingStart { .. } => {
            let mut pairs = Vec::new();
            loop {
                let key_event = parser.parse().map_err(YamlError::Parse)?;
                if matches!(key_event.data, EventData::MappingEnd) {
                    return Ok(RawNode::Mapping(pairs, first.start_mark));
                }
                let key = match key_event.data {
                    EventData::Scalar { value, .. } => value,
                    _ => {
                        return Err(YamlError::Open(
                            "mapping keys must be plain scalars".to_owned(),
                        ))
                    }
                };
                let value_event = parser.parse().map_err(YamlError::Parse)?;
                let value = read_node(parser, value_event)?;
                pairs.push((key, value));
            }
        }
        EventData::Alias { .. } => Err(YamlError::Open(
            "aliases are not supported in modulemd documents".to_owned(),
        )),
        other => Err(YamlError::Open(format!(
            "unexpected event while reading a value: {other:?}"
        ))),
    }
}

/// Result of [`parse`]: successfully parsed documents plus per-subdocument
/// failures, in input order.
pub struct ParseOutcome {
    pub documents: Vec<Document>,
    pub failures: Vec<SubdocumentInfo>,
}

/// Parses a complete multi-document YAML stream (spec §4.1.1).
///
/// A stream-level YAML error (malformed at the event layer) aborts the
/// whole call. Per-subdocument errors (unknown discriminator, failed
/// validation, strict-mode key rejection) are instead captured into
/// `failures` and parsing continues with the next subdocument.
pub(crate) fn parse(source: &str, strict: bool) -> Result<ParseOutcome, YamlError> {
    let chars: Vec<char> = source.chars().collect();
    let mut parser = Parser::new();
    parser
        .set_input_string(source)
        .map_err(|e| YamlError::Parse(e.into()))?;

    let mut documents = Vec::new();
    let mut failures = Vec::new();

    loop {
        let event = parser.parse().map_err(YamlError::Parse)?;
        match event.data {
            EventData::StreamStart { .. } => continue,
            EventData::StreamEnd => break,
            EventData::DocumentStart { .. } => {
                let start_index = event.start_mark.index as usize;
                let root_event = parser.parse().map_err(YamlError::Parse)?;
                let root = read_node(&mut parser, root_event)?;
                let end_event = parser.parse().map_err(YamlError::Parse)?;
                if !matches!(end_event.data, EventData::DocumentEnd { .. }) {
                    return Err(YamlError::Open(
                        "expected DOCUMENT-END after subdocument root mapping".to_owned(),
                    ));
                }
                let end_index = end_event.end_mark.index as usize;
                let yaml_text: String = chars
                    .get(start_index..end_index.min(chars.len()))
                    .map(|slice| slice.iter().collect())
                    .unwrap_or_default();

                match parse_subdocument(&root, strict) {
                    Ok(doc) => {
                        debug!(document = %doc.kind(), "parsed subdocument");
                        documents.push(doc);
                    }
                    Err(error) => {
                        warn!(%error, "rejecting subdocument");
                        failures.push(SubdocumentInfo::new(yaml_text, error));
                    }
                }
            }
            other => {
                trace!(?other, "ignoring stray top-level event");
            }
        }
    }

    Ok(ParseOutcome {
        documents,
        failures,
    })
}

fn parse_subdocument(root: &RawNode, strict: bool) -> Result<Document, ModulemdError> {
    root.check_known_keys("<root>", &["document", "version", "data"], strict)?;

    let document_kind = root
        .get("document")
        .ok_or_else(|| ModulemdError::missing_field("<root>", "document"))?
        .as_scalar("document")?;
    let version = root
        .get("version")
        .ok_or_else(|| ModulemdError::missing_field("<root>", "version"))?
        .as_u64("version")?;
    let data = root
        .get("data")
        .ok_or_else(|| ModulemdError::missing_field("<root>", "data"))?;

    crate::document::parse_subdocument(document_kind, version, data, strict)
}

/// Emits a sequence of documents as a single multi-document YAML stream
/// (spec §4.1.1 `emit`).
pub(crate) fn emit(documents: &[Document]) -> Result<String, YamlError> {
    let mut emitter = Emitter::new();
    emitter
        .emit(Event::stream_start(crate::Encoding::Utf8))
        .map_err(YamlError::Emit)?;

    for document in documents {
        emitter
            .emit(Event::document_start(None, &[], true))
            .map_err(YamlError::Emit)?;
        let root = crate::document::emit_subdocument(document);
        emit_node(&mut emitter, &root)?;
        emitter
            .emit(Event::document_end(true))
            .map_err(YamlError::Emit)?;
    }

    emitter
        .emit(Event::stream_end())
        .map_err(YamlError::Emit)?;

    emitter.into_string().map_err(YamlError::Emit)
}

/// Canonical emission style (spec §4.1.3): mappings are block style; short
/// sequences are flow style; everything else is plain scalars. "Short"
/// sequences are those the document-type emitters mark via
/// [`EmitNode::FlowSequence`]; all others are block.
pub(crate) enum EmitNode {
    Scalar(String),
    FlowSequence(Vec<EmitNode>),
    BlockSequence(Vec<EmitNode>),
    Mapping(Vec<(String, EmitNode)>),
    FoldedScalar(String),
}

fn emit_node(emitter: &mut Emitter, node: &EmitNode) -> Result<(), YamlError> {
    match node {
        EmitNode::Scalar(s) => emitter
            .emit(Event::scalar(None, None, s, true, true, ScalarStyle::Plain))
            .map_err(YamlError::Emit),
        EmitNode::FoldedScalar(s) => emitter
            .emit(Event::scalar(
                None,
                None,
                s,
                true,
                true,
                ScalarStyle::Folded,
            ))
            .map_err(YamlError::Emit),
        EmitNode::FlowSequence(items) => {
            emitter
                .emit(Event::sequence_start(
                    None,
                    None,
                    true,
                    crate::SequenceStyle::Flow,
                ))
                .map_err(YamlError::Emit)?;
            for item in items {
                emit_node(emitter, item)?;
            }
            emitter
                .emit(Event::sequence_end())
                .map_err(YamlError::Emit)
        }
        EmitNode::BlockSequence(items) => {
            emitter
                .emit(Event::sequence_start(
                    None,
                    None,
                    true,
                    crate::SequenceStyle::Block,
                ))
                .map_err(YamlError::Emit)?;
            for item in items {
                emit_node(emitter, item)?;
            }
            emitter
                .emit(Event::sequence_end())
                .map_err(YamlError::Emit)
        }
        EmitNode::Mapping(pairs) => {
            emitter
                .emit(Event::mapping_start(
                    None,
                    None,
                    true,
                    crate::MappingStyle::Block,
                ))
                .map_err(YamlError::Emit)?;
            for (key, value) in pairs {
                emitter
                    .emit(Event::scalar(
                        None,
                        None,
                        key,
                        true,
                        true,
                        ScalarStyle::Plain,
                    ))
                    .map_err(YamlError::Emit)?;
                emit_node(emitter, value)?;
            }
            emitter.emit(Event::mapping_end()).map_err(YamlError::Emit)
        }
    }
}

/// Builds a sorted `BTreeMap`-backed mapping node from a simple `String` set
/// (spec §4.1.2 "simple sets": "on emit, keys are written in sorted order
/// for determinism").
pub(crate) fn emit_sorted_scalar_seq(items: &std::collections::BTreeSet<String>) -> EmitNode {
    EmitNode::FlowSequence(items.iter().cloned().map(EmitNode::Scalar).collect())
}

/// Builds a mapping node from a `module -> set<stream>` map with both outer
/// keys and inner sets sorted (spec §4.1.2 "string-to-set maps").
pub(crate) fn emit_string_to_set_map(
    map: &BTreeMap<String, std::collections::BTreeSet<String>>,
) -> EmitNode {
    EmitNode::Mapping(
        map.iter()
            .map(|(k, v)| (k.clone(), emit_sorted_scalar_seq(v)))
            .collect(),
    )
}
