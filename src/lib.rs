//! Module metadata codec and index/merger for modular package repositories.
//!
//! This crate reads and writes modulemd YAML documents (module streams,
//! defaults, and translations), and aggregates them into a [`ModuleIndex`]
//! that can be merged across priority-ordered repositories with
//! [`IndexMerger`].
#![allow(non_snake_case)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::fn_params_excessive_bools,
    clippy::manual_range_contains,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::unnecessary_wraps,
    clippy::match_wildcard_for_single_variants
)]
#![deny(unsafe_code)]

#[macro_use]
mod macros;

mod codec;
mod document;
mod emitter;
mod error;
mod event;
mod identity;
mod merger;
mod module_index;
mod parser;
mod scanner;
mod token;
mod value;
mod version;
mod writer;
mod xmd;

pub use crate::document::{
    Defaults, Document, Intent, ModuleStream, StreamV1, StreamV2, Translation, TranslationEntry,
};
pub use crate::emitter::Emitter;
pub use crate::error::*;
pub use crate::event::*;
pub use crate::identity::{DefaultsVersion, Nsvc, StreamVersion};
pub use crate::merger::IndexMerger;
pub use crate::module_index::{Module, ModuleIndex, UpdateOutcome};
pub use crate::parser::Parser;
pub use crate::token::*;
pub use crate::value::{
    Buildopts, ComponentBuildopts, ComponentModule, ComponentRpm, Dependencies, Profile,
    References, RpmNevra, ServiceLevel,
};
pub use crate::version::{default_stream_mdversion, set_default_stream_mdversion, version};
pub use crate::xmd::Variant;

/// The version directive data.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct VersionDirective {
    /// The major version number.
    pub major: i32,
    /// The minor version number.
    pub minor: i32,
}

/// The tag directive data.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct TagDirective {
    /// The tag handle.
    pub handle: String,
    /// The tag prefix.
    pub prefix: String,
}

/// The stream encoding.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Encoding {
    /// Let the parser choose the encoding.
    #[default]
    Any = 0,
    /// The default UTF-8 encoding.
    Utf8 = 1,
    /// The UTF-16-LE encoding with BOM.
    Utf16Le = 2,
    /// The UTF-16-BE encoding with BOM.
    Utf16Be = 3,
}

/// Line break type.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Break {
    /// Let the parser choose the break type.
    #[default]
    Any = 0,
    /// Use CR for line breaks (Mac style).
    Cr = 1,
    /// Use LN for line breaks (Unix style).
    Ln = 2,
    /// Use CR LN for line breaks (DOS style).
    CrLn = 3,
}

/// Scalar styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ScalarStyle {
    /// Let the emitter choose the style.
    #[default]
    Any = 0,
    /// The plain scalar style.
    Plain = 1,
    /// The single-quoted scalar style.
    SingleQuoted = 2,
    /// The double-quoted scalar style.
    DoubleQuoted = 3,
    /// The literal scalar style.
    Literal = 4,
    /// The folded scalar style.
    Folded = 5,
}

/// Sequence styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SequenceStyle {
    /// Let the emitter choose the style.
    Any = 0,
    /// The block sequence style.
    Block = 1,
    /// The flow sequence style.
    Flow = 2,
}

/// Mapping styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum MappingStyle {
    /// Let the emitter choose the style.
    Any = 0,
    /// The block mapping style.
    Block = 1,
    /// The flow mapping style.
    Flow = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_reads_a_plain_mapping() {
        let mut parser = Parser::new();
        parser.set_input_string("name: foo\nstream: main\n").unwrap();
        let mut saw_scalar = false;
        loop {
            let event = parser.parse().unwrap();
            if matches!(event.data, EventData::Scalar { ref value, .. } if value == "foo") {
                saw_scalar = true;
            }
            if matches!(event.data, EventData::StreamEnd) {
                break;
            }
        }
        assert!(saw_scalar);
    }
}
