//! The `xmd` free-form value (spec §3, §9 "Polymorphic xmd values").
//!
//! Scalars decode as strings only (no YAML type inference, spec §4.1.2);
//! the emitter reproduces them verbatim as plain scalars. Maps are ordered
//! (`BTreeMap`) so emission is deterministic.

use std::collections::BTreeMap;

/// A recursive, opaque value carried verbatim through parse/emit.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Variant {
    String(String),
    List(Vec<Variant>),
    Map(BTreeMap<String, Variant>),
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Map(BTreeMap::new())
    }
}

impl Variant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Variant]> {
        match self {
            Variant::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Variant>> {
        match self {
            Variant::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_empty_map(&self) -> bool {
        matches!(self, Variant::Map(m) if m.is_empty())
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_round_trip() {
        let mut map = BTreeMap::new();
        map.insert("a".to_owned(), Variant::from("b"));
        let v = Variant::Map(map);
        assert_eq!(
            v.as_map().and_then(|m| m.get("a")).and_then(Variant::as_str),
            Some("b")
        );
    }
}
