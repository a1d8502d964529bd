//! Plain value types shared by module stream documents (spec §2 "Value
//! types", §3 "Entities").

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::{ErrorKind, ModulemdError};

/// A named lifecycle phase of a stream, with an optional end-of-life date.
/// `eol` is `None` for an open-ended service level (original's
/// `modulemd-servicelevel.c` allows this; spec.md §3 names the field but
/// not this edge case).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceLevel {
    pub name: String,
    pub eol: Option<NaiveDate>,
}

impl ServiceLevel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            eol: None,
        }
    }
}

/// A named subset of a stream's packages to install.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Profile {
    pub name: String,
    pub description: Option<String>,
    pub rpms: BTreeSet<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            rpms: BTreeSet::new(),
        }
    }
}

/// A single `buildrequires`/`requires` record in a v2 stream's `dependencies`
/// list (spec §3, §4.2 upgrade). A stream token prefixed with `-` means
/// "excluded".
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dependencies {
    pub buildtime: BTreeMap<String, BTreeSet<String>>,
    pub runtime: BTreeMap<String, BTreeSet<String>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self, path: &str) -> Result<(), ModulemdError> {
        for (module, streams) in self.buildtime.iter().chain(self.runtime.iter()) {
            for stream in streams {
                validate_stream_token(path, module, stream)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_stream_token(
    path: &str,
    module: &str,
    token: &str,
) -> Result<(), ModulemdError> {
    let bare = token.strip_prefix('-').unwrap_or(token);
    if bare.is_empty() || bare.chars().any(char::is_whitespace) {
        return Err(ModulemdError::invalid_value(
            path,
            format!("dependency `{module}`: invalid stream token `{token}`"),
        ));
    }
    Ok(())
}

/// Per-component build overrides (arches/multilib), keyed by component name.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ComponentBuildopts {
    pub arches: BTreeSet<String>,
    pub multilib: BTreeSet<String>,
}

/// Global and per-component build options (spec §3, §6.1 `buildopts`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Buildopts {
    pub rpm_macros: String,
    pub whitelist: Option<BTreeSet<String>>,
    pub component_opts: BTreeMap<String, ComponentBuildopts>,
}

/// A binary RPM's source component (spec §3 `rpm_components`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ComponentRpm {
    pub name: String,
    pub rationale: String,
    pub repository: Option<String>,
    pub cache: Option<String>,
    pub git_ref: Option<String>,
    pub arches: BTreeSet<String>,
    pub multilib: BTreeSet<String>,
    pub buildroot: bool,
    pub srpm_buildroot: bool,
}

impl ComponentRpm {
    pub(crate) fn validate(&self, path: &str) -> Result<(), ModulemdError> {
        if self.rationale.is_empty() {
            return Err(ModulemdError::missing_field(path, "rationale"));
        }
        Ok(())
    }
}

/// A module's source component (spec §3 `module_components`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ComponentModule {
    pub name: String,
    pub rationale: String,
    pub repository: Option<String>,
    pub git_ref: Option<String>,
    pub buildroot: bool,
}

impl ComponentModule {
    pub(crate) fn validate(&self, path: &str) -> Result<(), ModulemdError> {
        if self.rationale.is_empty() {
            return Err(ModulemdError::missing_field(path, "rationale"));
        }
        Ok(())
    }
}

/// Cross-reference URLs for a stream (spec §3 "references").
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct References {
    pub community: Option<String>,
    pub documentation: Option<String>,
    pub tracker: Option<String>,
}

/// A produced RPM NEVRA: `name-[epoch:]version-release.arch` (spec §2
/// supplemented feature B.3). Stored validated but otherwise opaque, as
/// the original's artifact handling treats it (`modulemd-module.c`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RpmNevra {
    pub name: String,
    pub epoch: Option<u32>,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl RpmNevra {
    /// Parses `name-[epoch:]version-release.arch`. The original project
    /// accepts this exact shape for `artifacts.rpms` entries
    /// (`modulemd-yaml-parser-modulemd.c`).
    pub fn parse(nevra: &str) -> Result<Self, ModulemdError> {
        let err = || {
            ModulemdError::new(
                ErrorKind::InvalidFieldValue,
                format!("`{nevra}` is not a valid RPM NEVRA"),
            )
        };

        let (rest, arch) = nevra.rsplit_once('.').ok_or_else(err)?;
        let (name_version, release) = rest.rsplit_once('-').ok_or_else(err)?;
        let (name, version_part) = name_version.rsplit_once('-').ok_or_else(err)?;

        let (epoch, version) = match version_part.split_once(':') {
            Some((epoch_str, version)) => {
                let epoch = epoch_str.parse::<u32>().map_err(|_| err())?;
                (Some(epoch), version.to_owned())
            }
            None => (None, version_part.to_owned()),
        };

        if name.is_empty() || version.is_empty() || release.is_empty() || arch.is_empty() {
            return Err(err());
        }

        Ok(RpmNevra {
            name: name.to_owned(),
            epoch,
            version,
            release: release.to_owned(),
            arch: arch.to_owned(),
        })
    }
}

impl std::fmt::Display for RpmNevra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-", self.name)?;
        if let Some(epoch) = self.epoch {
            write!(f, "{epoch}:")?;
        }
        write!(f, "{}-{}.{}", self.version, self.release, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nevra_round_trips_without_epoch() {
        let n = RpmNevra::parse("httpd-2.4.57-1.el9.x86_64").unwrap();
        assert_eq!(n.name, "httpd");
        assert_eq!(n.epoch, None);
        assert_eq!(n.to_string(), "httpd-2.4.57-1.el9.x86_64");
    }

    #[test]
    fn nevra_round_trips_with_epoch() {
        let n = RpmNevra::parse("httpd-2:2.4.57-1.el9.x86_64").unwrap();
        assert_eq!(n.epoch, Some(2));
        assert_eq!(n.to_string(), "httpd-2:2.4.57-1.el9.x86_64");
    }

    #[test]
    fn nevra_rejects_malformed_input() {
        assert!(RpmNevra::parse("not-a-nevra").is_err());
    }

    #[test]
    fn dependency_stream_token_rejects_whitespace() {
        assert!(validate_stream_token("dependencies", "platform", "has space").is_err());
    }

    #[test]
    fn dependency_stream_token_allows_exclusion_prefix() {
        assert!(validate_stream_token("dependencies", "platform", "-f28").is_ok());
    }
}
