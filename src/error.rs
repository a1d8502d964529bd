/// The pointer position.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Mark {
    /// The position index.
    pub index: u64,
    /// The position line.
    pub line: u64,
    /// The position column.
    pub column: u64,
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("{0}")]
    Problem(&'static str),
    #[error(transparent)]
    Writer(#[from] WriterError),
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("{problem}")]
    Problem {
        problem: &'static str,
        offset: usize,
        value: i32,
    },
    #[error("input stream produced an invalid byte order marker")]
    InvalidBom,
    #[error("invalid UTF-8 byte at offset: {value:x}")]
    InvalidUtf8 { value: u8 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{}:{}: {}", mark.line, mark.column, problem)]
    Problem { problem: &'static str, mark: Mark },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("no more tokens")]
    UnexpectedEof,
    #[error("{}:{}: {}", mark.line, mark.column, problem)]
    Problem { problem: &'static str, mark: Mark },
    #[error("{}:{}: {} {} ({}:{})", mark.line, mark.column, problem, context, context_mark.line, context_mark.column)]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

/// Bit-stable error codes, kept stable across releases so callers can match
/// on failure category without parsing message text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    YamlOpen,
    YamlParse,
    YamlEmit,
    UnknownDocumentType,
    UnknownVersion,
    VersionMismatch,
    MissingRequiredField,
    InvalidFieldValue,
    UnknownKeyStrict,
    MergeConflictDefaults,
    MergeConflictStream,
    PriorityOutOfRange,
    NothingToResolve,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::YamlOpen => "YamlOpen",
            ErrorKind::YamlParse => "YamlParse",
            ErrorKind::YamlEmit => "YamlEmit",
            ErrorKind::UnknownDocumentType => "UnknownDocumentType",
            ErrorKind::UnknownVersion => "UnknownVersion",
            ErrorKind::VersionMismatch => "VersionMismatch",
            ErrorKind::MissingRequiredField => "MissingRequiredField",
            ErrorKind::InvalidFieldValue => "InvalidFieldValue",
            ErrorKind::UnknownKeyStrict => "UnknownKeyStrict",
            ErrorKind::MergeConflictDefaults => "MergeConflictDefaults",
            ErrorKind::MergeConflictStream => "MergeConflictStream",
            ErrorKind::PriorityOutOfRange => "PriorityOutOfRange",
            ErrorKind::NothingToResolve => "NothingToResolve",
        };
        f.write_str(name)
    }
}

/// Top-level error for everything above the YAML event layer: document
/// validation, index bookkeeping, and merging.
#[derive(Debug, thiserror::Error)]
pub enum ModulemdError {
    #[error("{kind}: {message}")]
    Document { kind: ErrorKind, message: String },

    #[error("{0}")]
    Yaml(#[from] YamlError),
}

impl ModulemdError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ModulemdError::Document {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_field(path: &str, field: &str) -> Self {
        Self::new(
            ErrorKind::MissingRequiredField,
            format!("{path}: missing required field `{field}`"),
        )
    }

    pub fn invalid_value(path: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidFieldValue,
            format!("{path}: {reason}"),
        )
    }

    pub fn unknown_key(path: &str, key: &str) -> Self {
        Self::new(
            ErrorKind::UnknownKeyStrict,
            format!("{path}: unknown key `{key}`"),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ModulemdError::Document { kind, .. } => *kind,
            ModulemdError::Yaml(e) => e.kind(),
        }
    }
}

/// Stream-level YAML failure: the event layer itself could not make sense of
/// the bytes, independent of any particular subdocument's semantics.
#[derive(Debug, thiserror::Error)]
pub enum YamlError {
    #[error("failed to open YAML stream: {0}")]
    Open(String),
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Emit(#[from] EmitterError),
}

impl YamlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            YamlError::Open(_) => ErrorKind::YamlOpen,
            YamlError::Parse(_) => ErrorKind::YamlParse,
            YamlError::Emit(_) => ErrorKind::YamlEmit,
        }
    }
}

/// A subdocument that failed to parse or validate, carrying enough context
/// for a caller to report which upstream YAML was at fault. Mirrors the
/// original project's `ModulemdSubdocumentInfo`.
#[derive(Debug)]
pub struct SubdocumentInfo {
    /// The raw YAML text of the failed subdocument (from `document:` through
    /// the matching document end).
    pub yaml_text: String,
    /// Why the subdocument was rejected.
    pub error: ModulemdError,
}

impl SubdocumentInfo {
    pub fn new(yaml_text: impl Into<String>, error: ModulemdError) -> Self {
        SubdocumentInfo {
            yaml_text: yaml_text.into(),
            error,
        }
    }
}
