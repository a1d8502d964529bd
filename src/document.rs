//! Document types (spec §3, §4.2): versioned aggregates that each know
//! their own YAML shape, validation rules, and upgrade-from-previous-version.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::codec::{emit_sorted_scalar_seq, emit_string_to_set_map, EmitNode, RawNode};
use crate::identity::{validate_name, DefaultsVersion, Nsvc, StreamVersion};
use crate::value::{
    validate_stream_token, Buildopts, ComponentModule, ComponentRpm, Dependencies, Profile,
    References, ServiceLevel,
};
use crate::xmd::Variant;
use crate::{ErrorKind, ModulemdError};

// ---------------------------------------------------------------------
// Generic RawNode -> typed-value helpers, shared by every document type.
// ---------------------------------------------------------------------

fn scalar_set(path: &str, node: &RawNode) -> Result<BTreeSet<String>, ModulemdError> {
    Ok(node
        .as_sequence(path)?
        .iter()
        .map(|n| n.as_scalar(path).map(str::to_owned))
        .collect::<Result<BTreeSet<_>, _>>()?)
}

fn scalar_map(path: &str, node: &RawNode) -> Result<BTreeMap<String, String>, ModulemdError> {
    node.as_mapping(path)?
        .iter()
        .map(|(k, v)| Ok((k.clone(), v.as_scalar(path)?.to_owned())))
        .collect()
}

fn set_map(
    path: &str,
    node: &RawNode,
) -> Result<BTreeMap<String, BTreeSet<String>>, ModulemdError> {
    node.as_mapping(path)?
        .iter()
        .map(|(k, v)| Ok((k.clone(), scalar_set(path, v)?)))
        .collect()
}

fn parse_xmd(node: &RawNode) -> Variant {
    match node {
        RawNode::Scalar(s, _) => Variant::String(s.clone()),
        RawNode::Sequence(items, _) => Variant::List(items.iter().map(parse_xmd).collect()),
        RawNode::Mapping(pairs, _) => {
            Variant::Map(pairs.iter().map(|(k, v)| (k.clone(), parse_xmd(v))).collect())
        }
    }
}

fn emit_xmd(value: &Variant) -> EmitNode {
    match value {
        Variant::String(s) => EmitNode::Scalar(s.clone()),
        Variant::List(items) => EmitNode::BlockSequence(items.iter().map(emit_xmd).collect()),
        Variant::Map(map) => {
            EmitNode::Mapping(map.iter().map(|(k, v)| (k.clone(), emit_xmd(v))).collect())
        }
    }
}

fn emit_scalar_map(map: &BTreeMap<String, String>) -> EmitNode {
    EmitNode::Mapping(
        map.iter()
            .map(|(k, v)| (k.clone(), EmitNode::Scalar(v.clone())))
            .collect(),
    )
}

// ---------------------------------------------------------------------
// ModuleStream
// ---------------------------------------------------------------------

/// A versioned module stream aggregate (spec §3 "ModuleStream").
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleStream {
    V1(StreamV1),
    V2(StreamV2),
}

impl ModuleStream {
    pub fn mdversion(&self) -> StreamVersion {
        match self {
            ModuleStream::V1(_) => StreamVersion::V1,
            ModuleStream::V2(_) => StreamVersion::V2,
        }
    }

    pub fn module_name(&self) -> &str {
        match self {
            ModuleStream::V1(s) => &s.name,
            ModuleStream::V2(s) => &s.name,
        }
    }

    pub fn set_module_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            ModuleStream::V1(s) => s.name = name,
            ModuleStream::V2(s) => s.name = name,
        }
    }

    pub fn stream_name(&self) -> &str {
        match self {
            ModuleStream::V1(s) => &s.stream,
            ModuleStream::V2(s) => &s.stream,
        }
    }

    pub fn set_stream_name(&mut self, stream: impl Into<String>) {
        let stream = stream.into();
        match self {
            ModuleStream::V1(s) => s.stream = stream,
            ModuleStream::V2(s) => s.stream = stream,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            ModuleStream::V1(s) => s.version,
            ModuleStream::V2(s) => s.version,
        }
    }

    pub fn context(&self) -> &str {
        match self {
            ModuleStream::V1(s) => &s.context,
            ModuleStream::V2(s) => &s.context,
        }
    }

    pub fn nsvc(&self) -> Nsvc {
        Nsvc::new(self.module_name(), self.stream_name(), self.version(), self.context())
    }

    /// Deep copy (spec §4.2 `copy`). `ModuleStream` is plain data, so this
    /// is just `Clone`; kept as a named method to mirror the original's
    /// `modulemd_module_stream_copy`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Structural equality (spec §4.2 `equals`).
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }

    pub fn validate(&self) -> Result<(), ModulemdError> {
        match self {
            ModuleStream::V1(s) => s.validate(),
            ModuleStream::V2(s) => s.validate(),
        }
    }

    /// Upgrades this stream to `target`. Only v1 -> v2 is implemented
    /// (spec §4.2); requesting the stream's own version or an already-newer
    /// version is a no-op copy.
    pub fn upgrade(&self, target: StreamVersion) -> Result<ModuleStream, ModulemdError> {
        match (self, target) {
            (ModuleStream::V1(s), StreamVersion::V2) => Ok(ModuleStream::V2(s.upgrade_to_v2())),
            (s, t) if s.mdversion() == t => Ok(s.clone()),
            (ModuleStream::V2(_), StreamVersion::V1) => Err(ModulemdError::new(
                ErrorKind::VersionMismatch,
                "cannot downgrade a v2 module stream to v1",
            )),
            _ => unreachable!("exhaustive over StreamVersion variants"),
        }
    }

    /// Parses a single module stream out of a YAML byte stream (spec §6.2),
    /// for the packager use case where the caller reads a standalone stream
    /// document and may not know its `module_name`/`stream_name` until after
    /// parsing (e.g. derived from a build's NSVC). A stream-level YAML error,
    /// any rejected subdocument, or the absence of a `modulemd` document in
    /// the input all fail the call.
    pub fn read_from_bytes(
        bytes: &[u8],
        strict: bool,
        module_name: Option<&str>,
        stream_name: Option<&str>,
    ) -> Result<ModuleStream, ModulemdError> {
        let source = std::str::from_utf8(bytes).map_err(|e| {
            ModulemdError::new(ErrorKind::YamlOpen, format!("input is not valid UTF-8: {e}"))
        })?;
        let outcome = crate::codec::parse(source, strict)?;
        if let Some(failure) = outcome.failures.into_iter().next() {
            return Err(failure.error);
        }
        let mut stream = outcome
            .documents
            .into_iter()
            .find_map(|doc| match doc {
                Document::Stream(s) => Some(s),
                _ => None,
            })
            .ok_or_else(|| {
                ModulemdError::new(
                    ErrorKind::UnknownDocumentType,
                    "no modulemd stream document found in input",
                )
            })?;

        if let Some(name) = module_name {
            stream.set_module_name(name);
        }
        if let Some(name) = stream_name {
            stream.set_stream_name(name);
        }
        Ok(stream)
    }
}

/// v1 module stream: flat `buildrequires`/`requires` dependency mappings
/// (spec §3).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamV1 {
    pub name: String,
    pub stream: String,
    pub version: u64,
    pub context: String,
    pub arch: Option<String>,
    pub summary: String,
    pub description: String,
    pub module_licenses: BTreeSet<String>,
    pub content_licenses: BTreeSet<String>,
    pub xmd: Variant,
    pub buildrequires: BTreeMap<String, String>,
    pub requires: BTreeMap<String, String>,
    pub references: References,
    pub profiles: BTreeMap<String, Profile>,
    pub api: BTreeSet<String>,
    pub filter: BTreeSet<String>,
    pub buildopts: Buildopts,
    pub rpm_components: BTreeMap<String, ComponentRpm>,
    pub module_components: BTreeMap<String, ComponentModule>,
    pub artifacts: BTreeSet<String>,
    pub service_levels: BTreeMap<String, ServiceLevel>,
    pub eol: Option<NaiveDate>,
}

impl StreamV1 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ModulemdError> {
        validate_name("name", &self.name)?;
        if !self.stream.is_empty() {
            validate_name("stream", &self.stream)?;
        }
        if self.module_licenses.is_empty() {
            return Err(ModulemdError::missing_field("license.module", "module"));
        }
        if self.summary.is_empty() {
            return Err(ModulemdError::missing_field("<data>", "summary"));
        }
        if self.description.is_empty() {
            return Err(ModulemdError::missing_field("<data>", "description"));
        }
        for (module, stream) in self.buildrequires.iter().chain(self.requires.iter()) {
            validate_stream_token("dependencies", module, stream)?;
        }
        for (name, component) in &self.rpm_components {
            component
                .validate(&format!("components.rpms.{name}"))?;
        }
        for (name, component) in &self.module_components {
            component
                .validate(&format!("components.modules.{name}"))?;
        }
        Ok(())
    }

    /// v1 -> v2 upgrade (spec §4.2): the flat `requires`/`buildrequires`
    /// mappings become a single `Dependencies` record whose `runtime` and
    /// `buildtime` tables map each module to the one-element set containing
    /// its v1 stream. An `eol` becomes a service level named `rawhide`.
    pub fn upgrade_to_v2(&self) -> StreamV2 {
        let mut service_levels = self.service_levels.clone();
        if let Some(eol) = self.eol {
            service_levels
                .entry("rawhide".to_owned())
                .or_insert_with(|| ServiceLevel::new("rawhide"))
                .eol = Some(eol);
        }

        let to_singleton_map = |flat: &BTreeMap<String, String>| -> BTreeMap<String, BTreeSet<String>> {
            flat.iter()
                .map(|(k, v)| (k.clone(), BTreeSet::from([v.clone()])))
                .collect()
        };

        let dependencies = if self.requires.is_empty() && self.buildrequires.is_empty() {
            Vec::new()
        } else {
            vec![Dependencies {
                runtime: to_singleton_map(&self.requires),
                buildtime: to_singleton_map(&self.buildrequires),
            }]
        };

        StreamV2 {
            name: self.name.clone(),
            stream: self.stream.clone(),
            version: self.version,
            context: self.context.clone(),
            arch: self.arch.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            module_licenses: self.module_licenses.clone(),
            content_licenses: self.content_licenses.clone(),
            xmd: self.xmd.clone(),
            dependencies,
            references: self.references.clone(),
            profiles: self.profiles.clone(),
            api: self.api.clone(),
            filter: self.filter.clone(),
            buildopts: self.buildopts.clone(),
            rpm_components: self.rpm_components.clone(),
            module_components: self.module_components.clone(),
            artifacts: self.artifacts.clone(),
            service_levels,
        }
    }

    const KNOWN_KEYS: &'static [&'static str] = &[
        "name",
        "stream",
        "version",
        "context",
        "arch",
        "summary",
        "description",
        "servicelevels",
        "license",
        "xmd",
        "dependencies",
        "references",
        "profiles",
        "api",
        "filter",
        "buildopts",
        "components",
        "artifacts",
        "eol",
    ];

    fn parse(data: &RawNode, strict: bool) -> Result<Self, ModulemdError> {
        data.check_known_keys("data", Self::KNOWN_KEYS, strict)?;
        let mut s = StreamV1::new();
        if let Some(n) = data.get("name") {
            s.name = n.as_scalar("data.name")?.to_owned();
        }
        if let Some(n) = data.get("stream") {
            s.stream = n.as_scalar("data.stream")?.to_owned();
        }
        if let Some(n) = data.get("version") {
            s.version = n.as_u64("data.version")?;
        }
        if let Some(n) = data.get("context") {
            s.context = n.as_scalar("data.context")?.to_owned();
        }
        if let Some(n) = data.get("arch") {
            s.arch = Some(n.as_scalar("data.arch")?.to_owned());
        }
        if let Some(n) = data.get("summary") {
            s.summary = n.as_scalar("data.summary")?.to_owned();
        }
        if let Some(n) = data.get("description") {
            s.description = n.as_scalar("data.description")?.to_owned();
        }
        if let Some(n) = data.get("license") {
            let license = n.as_mapping("data.license")?;
            for (key, value) in license {
                match key.as_str() {
                    "module" => s.module_licenses = scalar_set("data.license.module", value)?,
                    "content" => s.content_licenses = scalar_set("data.license.content", value)?,
                    _ if strict => return Err(ModulemdError::unknown_key("data.license", key)),
                    _ => {}
                }
            }
        }
        if let Some(n) = data.get("xmd") {
            s.xmd = parse_xmd(n);
        }
        if let Some(n) = data.get("dependencies") {
            let deps = n.as_mapping("data.dependencies")?;
            for (key, value) in deps {
                match key.as_str() {
                    "buildrequires" => s.buildrequires = scalar_map("data.dependencies.buildrequires", value)?,
                    "requires" => s.requires = scalar_map("data.dependencies.requires", value)?,
                    _ if strict => {
                        return Err(ModulemdError::unknown_key("data.dependencies", key))
                    }
                    _ => {}
                }
            }
        }
        if let Some(n) = data.get("references") {
            s.references = parse_references(n, strict)?;
        }
        if let Some(n) = data.get("profiles") {
            s.profiles = parse_profiles(n, strict)?;
        }
        if let Some(n) = data.get("api") {
            let rpms = n.get("rpms").map(|r| scalar_set("data.api.rpms", r)).transpose()?;
            s.api = rpms.unwrap_or_default();
        }
        if let Some(n) = data.get("filter") {
            let rpms = n
                .get("rpms")
                .map(|r| scalar_set("data.filter.rpms", r))
                .transpose()?;
            s.filter = rpms.unwrap_or_default();
        }
        if let Some(n) = data.get("buildopts") {
            s.buildopts = parse_buildopts(n, strict)?;
        }
        if let Some(n) = data.get("components") {
            let (rpms, modules) = parse_components(n, strict)?;
            s.rpm_components = rpms;
            s.module_components = modules;
        }
        if let Some(n) = data.get("artifacts") {
            let rpms = n
                .get("rpms")
                .map(|r| scalar_set("data.artifacts.rpms", r))
                .transpose()?;
            s.artifacts = rpms.unwrap_or_default();
        }
        if let Some(n) = data.get("servicelevels") {
            s.service_levels = parse_service_levels(n, strict)?;
        }
        if let Some(n) = data.get("eol") {
            s.eol = Some(n.as_date("data.eol")?);
        }
        Ok(s)
    }

    fn emit(&self) -> EmitNode {
        let mut pairs = vec![
            ("name".to_owned(), EmitNode::Scalar(self.name.clone())),
            ("stream".to_owned(), EmitNode::Scalar(self.stream.clone())),
            ("version".to_owned(), EmitNode::Scalar(self.version.to_string())),
        ];
        if !self.context.is_empty() {
            pairs.push(("context".to_owned(), EmitNode::Scalar(self.context.clone())));
        }
        if let Some(arch) = &self.arch {
            pairs.push(("arch".to_owned(), EmitNode::Scalar(arch.clone())));
        }
        pairs.push(("summary".to_owned(), EmitNode::Scalar(self.summary.clone())));
        pairs.push((
            "description".to_owned(),
            EmitNode::FoldedScalar(self.description.clone()),
        ));
        if !self.service_levels.is_empty() {
            pairs.push(("servicelevels".to_owned(), emit_service_levels(&self.service_levels)));
        }
        pairs.push((
            "license".to_owned(),
            EmitNode::Mapping(
                [
                    ("module".to_owned(), emit_sorted_scalar_seq(&self.module_licenses)),
                    ("content".to_owned(), emit_sorted_scalar_seq(&self.content_licenses)),
                ]
                .into_iter()
                .filter(|(_, v)| !matches!(v, EmitNode::FlowSequence(items) if items.is_empty()))
                .collect(),
            ),
        ));
        if !self.xmd.is_empty_map() {
            pairs.push(("xmd".to_owned(), emit_xmd(&self.xmd)));
        }
        if !self.buildrequires.is_empty() || !self.requires.is_empty() {
            pairs.push((
                "dependencies".to_owned(),
                EmitNode::Mapping(vec![
                    ("buildrequires".to_owned(), emit_scalar_map(&self.buildrequires)),
                    ("requires".to_owned(), emit_scalar_map(&self.requires)),
                ]),
            ));
        }
        pairs.push(("references".to_owned(), emit_references(&self.references)));
        pairs.push(("profiles".to_owned(), emit_profiles(&self.profiles)));
        pairs.push((
            "api".to_owned(),
            EmitNode::Mapping(vec![("rpms".to_owned(), emit_sorted_scalar_seq(&self.api))]),
        ));
        pairs.push((
            "filter".to_owned(),
            EmitNode::Mapping(vec![("rpms".to_owned(), emit_sorted_scalar_seq(&self.filter))]),
        ));
        pairs.push(("buildopts".to_owned(), emit_buildopts(&self.buildopts)));
        pairs.push((
            "components".to_owned(),
            emit_components(&self.rpm_components, &self.module_components),
        ));
        pairs.push((
            "artifacts".to_owned(),
            EmitNode::Mapping(vec![("rpms".to_owned(), emit_sorted_scalar_seq(&self.artifacts))]),
        ));
        if let Some(eol) = self.eol {
            pairs.push(("eol".to_owned(), EmitNode::Scalar(eol.format("%Y-%m-%d").to_string())));
        }
        EmitNode::Mapping(pairs)
    }
}

/// v2 module stream: an ordered list of [`Dependencies`] records (spec §3).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamV2 {
    pub name: String,
    pub stream: String,
    pub version: u64,
    pub context: String,
    pub arch: Option<String>,
    pub summary: String,
    pub description: String,
    pub module_licenses: BTreeSet<String>,
    pub content_licenses: BTreeSet<String>,
    pub xmd: Variant,
    pub dependencies: Vec<Dependencies>,
    pub references: References,
    pub profiles: BTreeMap<String, Profile>,
    pub api: BTreeSet<String>,
    pub filter: BTreeSet<String>,
    pub buildopts: Buildopts,
    pub rpm_components: BTreeMap<String, ComponentRpm>,
    pub module_components: BTreeMap<String, ComponentModule>,
    pub artifacts: BTreeSet<String>,
    pub service_levels: BTreeMap<String, ServiceLevel>,
}

impl StreamV2 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ModulemdError> {
        validate_name("name", &self.name)?;
        if !self.stream.is_empty() {
            validate_name("stream", &self.stream)?;
        }
        if self.module_licenses.is_empty() {
            return Err(ModulemdError::missing_field("license.module", "module"));
        }
        if self.summary.is_empty() {
            return Err(ModulemdError::missing_field("<data>", "summary"));
        }
        if self.description.is_empty() {
            return Err(ModulemdError::missing_field("<data>", "description"));
        }
        for (i, dep) in self.dependencies.iter().enumerate() {
            dep.validate(&format!("dependencies[{i}]"))?;
        }
        for (name, component) in &self.rpm_components {
            component.validate(&format!("components.rpms.{name}"))?;
        }
        for (name, component) in &self.module_components {
            component.validate(&format!("components.modules.{name}"))?;
        }
        Ok(())
    }

    const KNOWN_KEYS: &'static [&'static str] = StreamV1::KNOWN_KEYS;

    fn parse(data: &RawNode, strict: bool) -> Result<Self, ModulemdError> {
        data.check_known_keys("data", Self::KNOWN_KEYS, strict)?;
        let mut s = StreamV2::new();
        if let Some(n) = data.get("name") {
            s.name = n.as_scalar("data.name")?.to_owned();
        }
        if let Some(n) = data.get("stream") {
            s.stream = n.as_scalar("data.stream")?.to_owned();
        }
        if let Some(n) = data.get("version") {
            s.version = n.as_u64("data.version")?;
        }
        if let Some(n) = data.get("context") {
            s.context = n.as_scalar("data.context")?.to_owned();
        }
        if let Some(n) = data.get("arch") {
            s.arch = Some(n.as_scalar("data.arch")?.to_owned());
        }
        if let Some(n) = data.get("summary") {
            s.summary = n.as_scalar("data.summary")?.to_owned();
        }
        if let Some(n) = data.get("description") {
            s.description = n.as_scalar("data.description")?.to_owned();
        }
        if let Some(n) = data.get("license") {
            let license = n.as_mapping("data.license")?;
            for (key, value) in license {
                match key.as_str() {
                    "module" => s.module_licenses = scalar_set("data.license.module", value)?,
                    "content" => s.content_licenses = scalar_set("data.license.content", value)?,
                    _ if strict => return Err(ModulemdError::unknown_key("data.license", key)),
                    _ => {}
                }
            }
        }
        if let Some(n) = data.get("xmd") {
            s.xmd = parse_xmd(n);
        }
        if let Some(n) = data.get("dependencies") {
            let entries = n.as_sequence("data.dependencies")?;
            for entry in entries {
                let pairs = entry.as_mapping("data.dependencies[]")?;
                let mut dep = Dependencies::new();
                for (key, value) in pairs {
                    match key.as_str() {
                        "buildrequires" => dep.buildtime = set_map("data.dependencies[].buildrequires", value)?,
                        "requires" => dep.runtime = set_map("data.dependencies[].requires", value)?,
                        _ if strict => {
                            return Err(ModulemdError::unknown_key("data.dependencies[]", key))
                        }
                        _ => {}
                    }
                }
                s.dependencies.push(dep);
            }
        }
        if let Some(n) = data.get("references") {
            s.references = parse_references(n, strict)?;
        }
        if let Some(n) = data.get("profiles") {
            s.profiles = parse_profiles(n, strict)?;
        }
        if let Some(n) = data.get("api") {
            let rpms = n.get("rpms").map(|r| scalar_set("data.api.rpms", r)).transpose()?;
            s.api = rpms.unwrap_or_default();
        }
        if let Some(n) = data.get("filter") {
            let rpms = n
                .get("rpms")
                .map(|r| scalar_set("data.filter.rpms", r))
                .transpose()?;
            s.filter = rpms.unwrap_or_default();
        }
        if let Some(n) = data.get("buildopts") {
            s.buildopts = parse_buildopts(n, strict)?;
        }
        if let Some(n) = data.get("components") {
            let (rpms, modules) = parse_components(n, strict)?;
            s.rpm_components = rpms;
            s.module_components = modules;
        }
        if let Some(n) = data.get("artifacts") {
            let rpms = n
                .get("rpms")
                .map(|r| scalar_set("data.artifacts.rpms", r))
                .transpose()?;
            s.artifacts = rpms.unwrap_or_default();
        }
        if let Some(n) = data.get("servicelevels") {
            s.service_levels = parse_service_levels(n, strict)?;
        }
        Ok(s)
    }

    fn emit(&self) -> EmitNode {
        let mut pairs = vec![
            ("name".to_owned(), EmitNode::Scalar(self.name.clone())),
            ("stream".to_owned(), EmitNode::Scalar(self.stream.clone())),
            ("version".to_owned(), EmitNode::Scalar(self.version.to_string())),
        ];
        if !self.context.is_empty() {
            pairs.push(("context".to_owned(), EmitNode::Scalar(self.context.clone())));
        }
        if let Some(arch) = &self.arch {
            pairs.push(("arch".to_owned(), EmitNode::Scalar(arch.clone())));
        }
        pairs.push(("summary".to_owned(), EmitNode::Scalar(self.summary.clone())));
        pairs.push((
            "description".to_owned(),
            EmitNode::FoldedScalar(self.description.clone()),
        ));
        if !self.service_levels.is_empty() {
            pairs.push(("servicelevels".to_owned(), emit_service_levels(&self.service_levels)));
        }
        pairs.push((
            "license".to_owned(),
            EmitNode::Mapping(vec![
                ("module".to_owned(), emit_sorted_scalar_seq(&self.module_licenses)),
                ("content".to_owned(), emit_sorted_scalar_seq(&self.content_licenses)),
            ]),
        ));
        if !self.xmd.is_empty_map() {
            pairs.push(("xmd".to_owned(), emit_xmd(&self.xmd)));
        }
        if !self.dependencies.is_empty() {
            pairs.push((
                "dependencies".to_owned(),
                EmitNode::BlockSequence(
                    self.dependencies
                        .iter()
                        .map(|dep| {
                            EmitNode::Mapping(vec![
                                ("buildrequires".to_owned(), emit_string_to_set_map(&dep.buildtime)),
                                ("requires".to_owned(), emit_string_to_set_map(&dep.runtime)),
                            ])
                        })
                        .collect(),
                ),
            ));
        }
        pairs.push(("references".to_owned(), emit_references(&self.references)));
        pairs.push(("profiles".to_owned(), emit_profiles(&self.profiles)));
        pairs.push((
            "api".to_owned(),
            EmitNode::Mapping(vec![("rpms".to_owned(), emit_sorted_scalar_seq(&self.api))]),
        ));
        pairs.push((
            "filter".to_owned(),
            EmitNode::Mapping(vec![("rpms".to_owned(), emit_sorted_scalar_seq(&self.filter))]),
        ));
        pairs.push(("buildopts".to_owned(), emit_buildopts(&self.buildopts)));
        pairs.push((
            "components".to_owned(),
            emit_components(&self.rpm_components, &self.module_components),
        ));
        pairs.push((
            "artifacts".to_owned(),
            EmitNode::Mapping(vec![("rpms".to_owned(), emit_sorted_scalar_seq(&self.artifacts))]),
        ));
        EmitNode::Mapping(pairs)
    }
}

fn parse_references(node: &RawNode, strict: bool) -> Result<References, ModulemdError> {
    let mut r = References::default();
    for (key, value) in node.as_mapping("data.references")? {
        match key.as_str() {
            "community" => r.community = Some(value.as_scalar("data.references.community")?.to_owned()),
            "documentation" => {
                r.documentation = Some(value.as_scalar("data.references.documentation")?.to_owned())
            }
            "tracker" => r.tracker = Some(value.as_scalar("data.references.tracker")?.to_owned()),
            _ if strict => return Err(ModulemdError::unknown_key("data.references", key)),
            _ => {}
        }
    }
    Ok(r)
}

fn emit_references(r: &References) -> EmitNode {
    let mut pairs = Vec::new();
    if let Some(c) = &r.community {
        pairs.push(("community".to_owned(), EmitNode::Scalar(c.clone())));
    }
    if let Some(d) = &r.documentation {
        pairs.push(("documentation".to_owned(), EmitNode::Scalar(d.clone())));
    }
    if let Some(t) = &r.tracker {
        pairs.push(("tracker".to_owned(), EmitNode::Scalar(t.clone())));
    }
    EmitNode::Mapping(pairs)
}

fn parse_profiles(
    node: &RawNode,
    strict: bool,
) -> Result<BTreeMap<String, Profile>, ModulemdError> {
    let mut profiles = BTreeMap::new();
    for (name, value) in node.as_mapping("data.profiles")? {
        let mut profile = Profile::new(name.clone());
        for (key, v) in value.as_mapping(&format!("data.profiles.{name}"))? {
            match key.as_str() {
                "description" => {
                    profile.description = Some(v.as_scalar("description")?.to_owned())
                }
                "rpms" => profile.rpms = scalar_set(&format!("data.profiles.{name}.rpms"), v)?,
                _ if strict => {
                    return Err(ModulemdError::unknown_key(&format!("data.profiles.{name}"), key))
                }
                _ => {}
            }
        }
        profiles.insert(name.clone(), profile);
    }
    Ok(profiles)
}

fn emit_profiles(profiles: &BTreeMap<String, Profile>) -> EmitNode {
    EmitNode::Mapping(
        profiles
            .iter()
            .map(|(name, profile)| {
                let mut pairs = Vec::new();
                if let Some(desc) = &profile.description {
                    pairs.push(("description".to_owned(), EmitNode::Scalar(desc.clone())));
                }
                pairs.push(("rpms".to_owned(), emit_sorted_scalar_seq(&profile.rpms)));
                (name.clone(), EmitNode::Mapping(pairs))
            })
            .collect(),
    )
}

fn parse_service_levels(
    node: &RawNode,
    strict: bool,
) -> Result<BTreeMap<String, ServiceLevel>, ModulemdError> {
    let mut levels = BTreeMap::new();
    for (name, value) in node.as_mapping("data.servicelevels")? {
        let mut level = ServiceLevel::new(name.clone());
        for (key, v) in value.as_mapping(&format!("data.servicelevels.{name}"))? {
            match key.as_str() {
                "eol" => level.eol = Some(v.as_date(&format!("data.servicelevels.{name}.eol"))?),
                _ if strict => {
                    return Err(ModulemdError::unknown_key(
                        &format!("data.servicelevels.{name}"),
                        key,
                    ))
                }
                _ => {}
            }
        }
        levels.insert(name.clone(), level);
    }
    Ok(levels)
}

fn emit_service_levels(levels: &BTreeMap<String, ServiceLevel>) -> EmitNode {
    EmitNode::Mapping(
        levels
            .iter()
            .map(|(name, level)| {
                let pairs = match level.eol {
                    Some(eol) => vec![(
                        "eol".to_owned(),
                        EmitNode::Scalar(eol.format("%Y-%m-%d").to_string()),
                    )],
                    None => Vec::new(),
                };
                (name.clone(), EmitNode::Mapping(pairs))
            })
            .collect(),
    )
}

fn parse_buildopts(node: &RawNode, strict: bool) -> Result<Buildopts, ModulemdError> {
    let mut opts = Buildopts::default();
    for (key, value) in node.as_mapping("data.buildopts")? {
        match key.as_str() {
            "rpms" => {
                for (rk, rv) in value.as_mapping("data.buildopts.rpms")? {
                    match rk.as_str() {
                        "macros" => opts.rpm_macros = rv.as_scalar("data.buildopts.rpms.macros")?.to_owned(),
                        "whitelist" => {
                            opts.whitelist = Some(scalar_set("data.buildopts.rpms.whitelist", rv)?)
                        }
                        "arches" => {
                            for (name, arches) in rv.as_mapping("data.buildopts.rpms.arches")? {
                                opts.component_opts.entry(name.clone()).or_default().arches =
                                    scalar_set("data.buildopts.rpms.arches", arches)?;
                            }
                        }
                        "multilib" => {
                            for (name, multilib) in rv.as_mapping("data.buildopts.rpms.multilib")? {
                                opts.component_opts.entry(name.clone()).or_default().multilib =
                                    scalar_set("data.buildopts.rpms.multilib", multilib)?;
                            }
                        }
                        _ if strict => {
                            return Err(ModulemdError::unknown_key("data.buildopts.rpms", rk))
                        }
                        _ => {}
                    }
                }
            }
            _ if strict => return Err(ModulemdError::unknown_key("data.buildopts", key)),
            _ => {}
        }
    }
    Ok(opts)
}

fn emit_buildopts(opts: &Buildopts) -> EmitNode {
    let mut rpms = vec![("macros".to_owned(), EmitNode::FoldedScalar(opts.rpm_macros.clone()))];
    if let Some(whitelist) = &opts.whitelist {
        rpms.push(("whitelist".to_owned(), emit_sorted_scalar_seq(whitelist)));
    }
    if !opts.component_opts.is_empty() {
        rpms.push((
            "arches".to_owned(),
            EmitNode::Mapping(
                opts.component_opts
                    .iter()
                    .filter(|(_, c)| !c.arches.is_empty())
                    .map(|(name, c)| (name.clone(), emit_sorted_scalar_seq(&c.arches)))
                    .collect(),
            ),
        ));
        rpms.push((
            "multilib".to_owned(),
            EmitNode::Mapping(
                opts.component_opts
                    .iter()
                    .filter(|(_, c)| !c.multilib.is_empty())
                    .map(|(name, c)| (name.clone(), emit_sorted_scalar_seq(&c.multilib)))
                    .collect(),
            ),
        ));
    }
    EmitNode::Mapping(vec![("rpms".to_owned(), EmitNode::Mapping(rpms))])
}

fn parse_components(
    node: &RawNode,
    strict: bool,
) -> Result<(BTreeMap<String, ComponentRpm>, BTreeMap<String, ComponentModule>), ModulemdError> {
    let mut rpms = BTreeMap::new();
    let mut modules = BTreeMap::new();
    for (key, value) in node.as_mapping("data.components")? {
        match key.as_str() {
            "rpms" => {
                for (name, v) in value.as_mapping("data.components.rpms")? {
                    rpms.insert(name.clone(), parse_component_rpm(name, v, strict)?);
                }
            }
            "modules" => {
                for (name, v) in value.as_mapping("data.components.modules")? {
                    modules.insert(name.clone(), parse_component_module(name, v, strict)?);
                }
            }
            _ if strict => return Err(ModulemdError::unknown_key("data.components", key)),
            _ => {}
        }
    }
    Ok((rpms, modules))
}

fn parse_component_rpm(name: &str, node: &RawNode, strict: bool) -> Result<ComponentRpm, ModulemdError> {
    let path = format!("data.components.rpms.{name}");
    let mut c = ComponentRpm {
        name: name.to_owned(),
        ..Default::default()
    };
    for (key, value) in node.as_mapping(&path)? {
        match key.as_str() {
            "rationale" => c.rationale = value.as_scalar(&path)?.to_owned(),
            "repository" => c.repository = Some(value.as_scalar(&path)?.to_owned()),
            "cache" => c.cache = Some(value.as_scalar(&path)?.to_owned()),
            "ref" => c.git_ref = Some(value.as_scalar(&path)?.to_owned()),
            "arches" => c.arches = scalar_set(&path, value)?,
            "multilib" => c.multilib = scalar_set(&path, value)?,
            "buildroot" => c.buildroot = value.as_scalar(&path)? == "true",
            "srpm-buildroot" => c.srpm_buildroot = value.as_scalar(&path)? == "true",
            _ if strict => return Err(ModulemdError::unknown_key(&path, key)),
            _ => {}
        }
    }
    Ok(c)
}

fn parse_component_module(
    name: &str,
    node: &RawNode,
    strict: bool,
) -> Result<ComponentModule, ModulemdError> {
    let path = format!("data.components.modules.{name}");
    let mut c = ComponentModule {
        name: name.to_owned(),
        ..Default::default()
    };
    for (key, value) in node.as_mapping(&path)? {
        match key.as_str() {
            "rationale" => c.rationale = value.as_scalar(&path)?.to_owned(),
            "repository" => c.repository = Some(value.as_scalar(&path)?.to_owned()),
            "ref" => c.git_ref = Some(value.as_scalar(&path)?.to_owned()),
            "buildroot" => c.buildroot = value.as_scalar(&path)? == "true",
            _ if strict => return Err(ModulemdError::unknown_key(&path, key)),
            _ => {}
        }
    }
    Ok(c)
}

fn emit_components(
    rpms: &BTreeMap<String, ComponentRpm>,
    modules: &BTreeMap<String, ComponentModule>,
) -> EmitNode {
    EmitNode::Mapping(vec![
        (
            "rpms".to_owned(),
            EmitNode::Mapping(
                rpms.iter()
                    .map(|(name, c)| {
                        let mut pairs = vec![("rationale".to_owned(), EmitNode::FoldedScalar(c.rationale.clone()))];
                        if let Some(r) = &c.repository {
                            pairs.push(("repository".to_owned(), EmitNode::Scalar(r.clone())));
                        }
                        if let Some(r) = &c.cache {
                            pairs.push(("cache".to_owned(), EmitNode::Scalar(r.clone())));
                        }
                        if let Some(r) = &c.git_ref {
                            pairs.push(("ref".to_owned(), EmitNode::Scalar(r.clone())));
                        }
                        if !c.arches.is_empty() {
                            pairs.push(("arches".to_owned(), emit_sorted_scalar_seq(&c.arches)));
                        }
                        if !c.multilib.is_empty() {
                            pairs.push(("multilib".to_owned(), emit_sorted_scalar_seq(&c.multilib)));
                        }
                        (name.clone(), EmitNode::Mapping(pairs))
                    })
                    .collect(),
            ),
        ),
        (
            "modules".to_owned(),
            EmitNode::Mapping(
                modules
                    .iter()
                    .map(|(name, c)| {
                        let mut pairs = vec![("rationale".to_owned(), EmitNode::FoldedScalar(c.rationale.clone()))];
                        if let Some(r) = &c.repository {
                            pairs.push(("repository".to_owned(), EmitNode::Scalar(r.clone())));
                        }
                        if let Some(r) = &c.git_ref {
                            pairs.push(("ref".to_owned(), EmitNode::Scalar(r.clone())));
                        }
                        (name.clone(), EmitNode::Mapping(pairs))
                    })
                    .collect(),
            ),
        ),
    ])
}

// ---------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------

/// Per-module document selecting a default stream and default profiles
/// (spec §3 "Defaults").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Defaults {
    pub module_name: String,
    pub default_stream: Option<String>,
    pub profile_defaults: BTreeMap<String, BTreeSet<String>>,
    pub modified: u64,
    pub intents: BTreeMap<String, Intent>,
}

/// A named intent within a [`Defaults`] document: itself a well-formed
/// defaults body (spec §3).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Intent {
    pub default_stream: Option<String>,
    pub profile_defaults: BTreeMap<String, BTreeSet<String>>,
}

impl Defaults {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModulemdError> {
        validate_name("module", &self.module_name)?;
        Ok(())
    }

    pub fn mdversion(&self) -> DefaultsVersion {
        DefaultsVersion::V1
    }

    /// Structural copy; only one defaults version presently exists (spec
    /// §4.2).
    pub fn upgrade(&self, _target: DefaultsVersion) -> Defaults {
        self.clone()
    }

    const KNOWN_KEYS: &'static [&'static str] = &["module", "stream", "profiles", "intents", "modified"];

    fn parse(data: &RawNode, strict: bool) -> Result<Self, ModulemdError> {
        data.check_known_keys("data", Self::KNOWN_KEYS, strict)?;
        let mut d = Defaults::default();
        if let Some(n) = data.get("module") {
            d.module_name = n.as_scalar("data.module")?.to_owned();
        }
        if let Some(n) = data.get("stream") {
            d.default_stream = Some(n.as_scalar("data.stream")?.to_owned());
        }
        if let Some(n) = data.get("profiles") {
            d.profile_defaults = set_map("data.profiles", n)?;
        }
        if let Some(n) = data.get("modified") {
            d.modified = n.as_u64("data.modified")?;
        }
        if let Some(n) = data.get("intents") {
            for (name, value) in n.as_mapping("data.intents")? {
                d.intents.insert(name.clone(), parse_intent(name, value, strict)?);
            }
        }
        Ok(d)
    }

    fn emit(&self) -> EmitNode {
        let mut pairs = vec![("module".to_owned(), EmitNode::Scalar(self.module_name.clone()))];
        if let Some(stream) = &self.default_stream {
            pairs.push(("stream".to_owned(), EmitNode::Scalar(stream.clone())));
        }
        if !self.profile_defaults.is_empty() {
            pairs.push(("profiles".to_owned(), emit_string_to_set_map(&self.profile_defaults)));
        }
        if !self.intents.is_empty() {
            pairs.push((
                "intents".to_owned(),
                EmitNode::Mapping(
                    self.intents
                        .iter()
                        .map(|(name, intent)| (name.clone(), emit_intent(intent)))
                        .collect(),
                ),
            ));
        }
        pairs.push(("modified".to_owned(), EmitNode::Scalar(self.modified.to_string())));
        EmitNode::Mapping(pairs)
    }
}

fn parse_intent(name: &str, node: &RawNode, strict: bool) -> Result<Intent, ModulemdError> {
    let path = format!("data.intents.{name}");
    let mut intent = Intent::default();
    for (key, value) in node.as_mapping(&path)? {
        match key.as_str() {
            "stream" => intent.default_stream = Some(value.as_scalar(&path)?.to_owned()),
            "profiles" => intent.profile_defaults = set_map(&path, value)?,
            _ if strict => return Err(ModulemdError::unknown_key(&path, key)),
            _ => {}
        }
    }
    Ok(intent)
}

fn emit_intent(intent: &Intent) -> EmitNode {
    let mut pairs = Vec::new();
    if let Some(stream) = &intent.default_stream {
        pairs.push(("stream".to_owned(), EmitNode::Scalar(stream.clone())));
    }
    if !intent.profile_defaults.is_empty() {
        pairs.push(("profiles".to_owned(), emit_string_to_set_map(&intent.profile_defaults)));
    }
    EmitNode::Mapping(pairs)
}

// ---------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------

/// Localized summary/description/profile descriptions for one
/// `(module, stream)`, keyed by locale (spec §3 "Translation").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Translation {
    pub module_name: String,
    pub stream_name: String,
    pub modified: u64,
    pub translations: BTreeMap<String, TranslationEntry>,
}

/// One locale's worth of translated strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationEntry {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub profiles: BTreeMap<String, String>,
}

impl Translation {
    pub fn new(module_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            stream_name: stream_name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModulemdError> {
        validate_name("module", &self.module_name)?;
        validate_name("stream", &self.stream_name)?;
        if self.modified == 0 {
            return Err(ModulemdError::invalid_value("modified", "must be greater than zero"));
        }
        for locale in self.translations.keys() {
            if locale.is_empty() {
                return Err(ModulemdError::invalid_value("translations", "locale must not be empty"));
            }
        }
        Ok(())
    }

    const KNOWN_KEYS: &'static [&'static str] = &["module", "stream", "modified", "translations"];

    fn parse(data: &RawNode, strict: bool) -> Result<Self, ModulemdError> {
        data.check_known_keys("data", Self::KNOWN_KEYS, strict)?;
        let mut t = Translation::default();
        if let Some(n) = data.get("module") {
            t.module_name = n.as_scalar("data.module")?.to_owned();
        }
        if let Some(n) = data.get("stream") {
            t.stream_name = n.as_scalar("data.stream")?.to_owned();
        }
        if let Some(n) = data.get("modified") {
            t.modified = n.as_u64("data.modified")?;
        }
        if let Some(n) = data.get("translations") {
            for (locale, value) in n.as_mapping("data.translations")? {
                let path = format!("data.translations.{locale}");
                let mut entry = TranslationEntry::default();
                for (key, v) in value.as_mapping(&path)? {
                    match key.as_str() {
                        "summary" => entry.summary = Some(v.as_scalar(&path)?.to_owned()),
                        "description" => entry.description = Some(v.as_scalar(&path)?.to_owned()),
                        "profiles" => entry.profiles = scalar_map(&path, v)?,
                        _ if strict => return Err(ModulemdError::unknown_key(&path, key)),
                        _ => {}
                    }
                }
                t.translations.insert(locale.clone(), entry);
            }
        }
        Ok(t)
    }

    fn emit(&self) -> EmitNode {
        EmitNode::Mapping(vec![
            ("module".to_owned(), EmitNode::Scalar(self.module_name.clone())),
            ("stream".to_owned(), EmitNode::Scalar(self.stream_name.clone())),
            ("modified".to_owned(), EmitNode::Scalar(self.modified.to_string())),
            (
                "translations".to_owned(),
                EmitNode::Mapping(
                    self.translations
                        .iter()
                        .map(|(locale, entry)| {
                            let mut pairs = Vec::new();
                            if let Some(s) = &entry.summary {
                                pairs.push(("summary".to_owned(), EmitNode::Scalar(s.clone())));
                            }
                            if let Some(d) = &entry.description {
                                pairs.push(("description".to_owned(), EmitNode::FoldedScalar(d.clone())));
                            }
                            if !entry.profiles.is_empty() {
                                pairs.push(("profiles".to_owned(), emit_scalar_map(&entry.profiles)));
                            }
                            (locale.clone(), EmitNode::Mapping(pairs))
                        })
                        .collect(),
                ),
            ),
        ])
    }
}

// ---------------------------------------------------------------------
// Document: tagged union + dispatch
// ---------------------------------------------------------------------

/// A parsed subdocument of any of the three recognized shapes (spec §9
/// "Polymorphic document types").
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Stream(ModuleStream),
    Defaults(Defaults),
    Translation(Translation),
}

impl Document {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Document::Stream(_) => "modulemd",
            Document::Defaults(_) => "modulemd-defaults",
            Document::Translation(_) => "modulemd-translations",
        }
    }

    pub fn validate(&self) -> Result<(), ModulemdError> {
        match self {
            Document::Stream(s) => s.validate(),
            Document::Defaults(d) => d.validate(),
            Document::Translation(t) => t.validate(),
        }
    }
}

pub(crate) fn parse_subdocument(
    document_kind: &str,
    version: u64,
    data: &RawNode,
    strict: bool,
) -> Result<Document, ModulemdError> {
    let doc = match document_kind {
        "modulemd" => {
            let stream_version = StreamVersion::try_from(version)?;
            let stream = match stream_version {
                StreamVersion::V1 => ModuleStream::V1(StreamV1::parse(data, strict)?),
                StreamVersion::V2 => ModuleStream::V2(StreamV2::parse(data, strict)?),
            };
            Document::Stream(stream)
        }
        "modulemd-defaults" => {
            DefaultsVersion::try_from(version)?;
            Document::Defaults(Defaults::parse(data, strict)?)
        }
        "modulemd-translations" => {
            if version != 1 {
                return Err(ModulemdError::new(
                    ErrorKind::UnknownVersion,
                    format!("modulemd-translations version {version} is not supported"),
                ));
            }
            Document::Translation(Translation::parse(data, strict)?)
        }
        other => {
            return Err(ModulemdError::new(
                ErrorKind::UnknownDocumentType,
                format!("unrecognized document type `{other}`"),
            ))
        }
    };
    doc.validate()?;
    Ok(doc)
}

pub(crate) fn emit_subdocument(doc: &Document) -> EmitNode {
    let (document_kind, version, data) = match doc {
        Document::Stream(ModuleStream::V1(s)) => ("modulemd", 1u64, s.emit()),
        Document::Stream(ModuleStream::V2(s)) => ("modulemd", 2u64, s.emit()),
        Document::Defaults(d) => ("modulemd-defaults", 1u64, d.emit()),
        Document::Translation(t) => ("modulemd-translations", 1u64, t.emit()),
    };
    EmitNode::Mapping(vec![
        ("document".to_owned(), EmitNode::Scalar(document_kind.to_owned())),
        ("version".to_owned(), EmitNode::Scalar(version.to_string())),
        ("data".to_owned(), data),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_v1() -> StreamV1 {
        let mut s = StreamV1::new();
        s.name = "sssd".to_owned();
        s.stream = "1".to_owned();
        s.summary = "System Security Services Daemon".to_owned();
        s.description = "Provides identity, auth, and policy services".to_owned();
        s.module_licenses = BTreeSet::from(["MIT".to_owned()]);
        s.requires.insert("platform".to_owned(), "f28".to_owned());
        s
    }

    #[test]
    fn v1_validate_requires_license() {
        let mut s = sample_v1();
        s.module_licenses.clear();
        assert!(s.validate().is_err());
    }

    #[test]
    fn v1_to_v2_upgrade_preserves_identity_and_licenses() {
        let s = sample_v1();
        let v2 = s.upgrade_to_v2();
        assert_eq!(v2.name, s.name);
        assert_eq!(v2.stream, s.stream);
        assert_eq!(v2.module_licenses, s.module_licenses);
        assert_eq!(v2.dependencies.len(), 1);
        assert_eq!(
            v2.dependencies[0].runtime.get("platform").map(BTreeSet::len),
            Some(1)
        );
    }

    #[test]
    fn eol_becomes_rawhide_service_level() {
        let mut s = sample_v1();
        s.eol = Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let v2 = s.upgrade_to_v2();
        assert_eq!(
            v2.service_levels.get("rawhide").and_then(|l| l.eol),
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
    }

    #[test]
    fn nsvc_display_matches_identity() {
        let stream = ModuleStream::V1(sample_v1());
        assert_eq!(stream.nsvc().to_string(), "sssd:1:0");
    }
}
