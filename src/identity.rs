//! Module/stream identity: names, versions, and the `N:S:V:C` tuple (spec §3).

use crate::{ErrorKind, ModulemdError};

/// Schema version of a [`crate::ModuleStream`] document.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum StreamVersion {
    V1 = 1,
    V2 = 2,
}

impl StreamVersion {
    pub fn as_u64(self) -> u64 {
        self as u64
    }
}

impl TryFrom<u64> for StreamVersion {
    type Error = ModulemdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StreamVersion::V1),
            2 => Ok(StreamVersion::V2),
            other => Err(ModulemdError::new(
                ErrorKind::UnknownVersion,
                format!("modulemd version {other} is not supported"),
            )),
        }
    }
}

/// Schema version of a [`crate::Defaults`] document. Only one presently
/// exists (spec §4.2: "Defaults upgrade is a structural copy").
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum DefaultsVersion {
    V1 = 1,
}

impl DefaultsVersion {
    pub fn as_u64(self) -> u64 {
        self as u64
    }
}

impl TryFrom<u64> for DefaultsVersion {
    type Error = ModulemdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DefaultsVersion::V1),
            other => Err(ModulemdError::new(
                ErrorKind::UnknownVersion,
                format!("modulemd-defaults version {other} is not supported"),
            )),
        }
    }
}

/// Validates a module or stream name: non-empty, printable ASCII, no
/// whitespace (spec §3 "Identities"). Stream names may be validated
/// separately since they are allowed to be empty while a stream is under
/// construction (spec §3).
pub(crate) fn validate_name(path: &str, value: &str) -> Result<(), ModulemdError> {
    if value.is_empty() {
        return Err(ModulemdError::missing_field(path, "name"));
    }
    if !value.is_ascii() || !value.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ModulemdError::invalid_value(
            path,
            format!("`{value}` must be printable ASCII with no whitespace"),
        ));
    }
    Ok(())
}

/// The tuple identity of a built module stream: `N:S:V:C`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Nsvc {
    pub name: String,
    pub stream: String,
    pub version: u64,
    pub context: String,
}

impl Nsvc {
    pub fn new(name: impl Into<String>, stream: impl Into<String>, version: u64, context: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
            version,
            context: context.into(),
        }
    }
}

impl std::fmt::Display for Nsvc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.stream, self.version)?;
        if !self.context.is_empty() {
            write!(f, ":{}", self.context)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nsvc_omits_empty_context() {
        let n = Nsvc::new("httpd", "2.6", 20231101, "");
        assert_eq!(n.to_string(), "httpd:2.6:20231101");
    }

    #[test]
    fn nsvc_includes_context() {
        let n = Nsvc::new("httpd", "2.6", 20231101, "c0ffee42");
        assert_eq!(n.to_string(), "httpd:2.6:20231101:c0ffee42");
    }

    #[test]
    fn validate_name_rejects_whitespace() {
        assert!(validate_name("module_name", "has space").is_err());
    }

    #[test]
    fn validate_name_rejects_empty() {
        assert!(validate_name("module_name", "").is_err());
    }
}
