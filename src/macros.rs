//! Small character-classification helpers used by the scanner and emitter.
//! Operate on `Option<char>` so callers can pass the result of `chars().next()`
//! directly without re-checking for end-of-input.

pub(crate) fn is_alpha(ch: impl Into<Option<char>>) -> bool {
    let Some(ch) = ch.into() else {
        return false;
    };
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

pub(crate) fn is_digit(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some(c) if c.is_ascii_digit())
}

pub(crate) fn is_blank(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some(' ') | Some('\t'))
}

pub(crate) fn is_break(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some('\r') | Some('\n'))
}

pub(crate) fn is_blankz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_blank(ch) || is_break(ch) || ch.is_none()
}

pub(crate) fn is_breakz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_break(ch) || ch.is_none()
}

pub(crate) fn is_flow_indicator(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some(',' | '[' | ']' | '{' | '}'))
}

pub(crate) fn is_ascii(ch: char) -> bool {
    ch.is_ascii()
}

pub(crate) fn is_bom(ch: char) -> bool {
    ch == '\u{feff}'
}

pub(crate) fn is_space(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some(' ')
}

pub(crate) fn is_printable(ch: impl Into<Option<char>>) -> bool {
    match ch.into() {
        Some(c) => !c.is_control() || c == '\t' || c == '\n',
        None => true,
    }
}
