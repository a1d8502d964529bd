//! Tokenizer: turns source text into the flat [`Token`] stream the [`crate::parser`]
//! state machine consumes.
//!
//! Unlike a streaming libyaml scanner this tokenizes the whole input eagerly:
//! the codec's public contract (`parse(source, strict)`, spec §4.1.1) already
//! requires the full byte source up front, so there is nothing to gain from
//! incremental scanning and a lot of complexity (simple-key lookahead buffers)
//! to lose by not doing it.

use std::collections::VecDeque;

use crate::macros::{is_alpha, is_blank, is_blankz, is_break, is_digit, is_flow_indicator};
use crate::{Encoding, Mark, ScannerError, Token, TokenData};

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    mark: Mark,
    /// Open block indentation levels (column of the construct that opened
    /// them). `-1` represents "no block open" (top of document).
    indents: Vec<i64>,
    flow_level: u32,
    tokens: VecDeque<Token>,
    /// Have we seen the first real (non-directive) line of the current
    /// document yet? Directives are only legal before it.
    seen_document_content: bool,
}

pub(crate) fn tokenize(src: &str) -> Result<VecDeque<Token>, ScannerError> {
    let mut lexer = Lexer {
        chars: src.chars().collect(),
        pos: 0,
        mark: Mark {
            index: 0,
            line: 1,
            column: 1,
        },
        indents: Vec::new(),
        flow_level: 0,
        tokens: VecDeque::new(),
        seen_document_content: false,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

fn problem(problem: &'static str, mark: Mark) -> ScannerError {
    ScannerError::Problem { problem, mark }
}

fn is_blankz_char(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == '\n'
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn at_line_start(&self) -> bool {
        self.mark.column == 1
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        self.mark.index += 1;
        if is_break(Some(ch)) {
            self.mark.line += 1;
            self.mark.column = 1;
        } else {
            self.mark.column += 1;
        }
        Some(ch)
    }

    fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn push(&mut self, data: TokenData, start_mark: Mark, end_mark: Mark) {
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
    }

    /// Skip whitespace, line breaks, and comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), ScannerError> {
        loop {
            match self.peek() {
                Some(' ') => {
                    self.advance();
                }
                Some('\t') if self.flow_level > 0 || !self.at_line_start() => {
                    self.advance();
                }
                Some('#') => {
                    while !matches!(self.peek(), None) && !is_break(self.peek()) {
                        self.advance();
                    }
                }
                Some(c) if is_break(Some(c)) => {
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn current_column(&self) -> i64 {
        (self.mark.column - 1) as i64
    }

    fn unroll_indent(&mut self, column: i64) {
        if self.flow_level > 0 {
            return;
        }
        while *self.indents.last().unwrap_or(&-1) > column {
            self.indents.pop();
            let m = self.mark;
            self.push(TokenData::BlockEnd, m, m);
        }
    }

    /// If `column` opens a new block level, push the start token.
    fn roll_indent(&mut self, column: i64, start_mark: Mark, is_sequence: bool) {
        if *self.indents.last().unwrap_or(&-1) < column {
            self.indents.push(column);
            let data = if is_sequence {
                TokenData::BlockSequenceStart
            } else {
                TokenData::BlockMappingStart
            };
            self.push(data, start_mark, start_mark);
        }
    }

    fn run(&mut self) -> Result<(), ScannerError> {
        let start = self.mark;
        self.push(
            TokenData::StreamStart {
                encoding: Encoding::Utf8,
            },
            start,
            start,
        );

        loop {
            self.skip_whitespace_and_comments()?;

            if self.peek().is_none() {
                self.unroll_indent(-1);
                let m = self.mark;
                self.push(TokenData::StreamEnd, m, m);
                return Ok(());
            }

            if self.at_line_start() && self.flow_level == 0 {
                if self.starts_with("---") && self.peek_at(3).map_or(true, is_blankz_char) {
                    self.unroll_indent(-1);
                    let start_mark = self.mark;
                    self.skip(3);
                    let end_mark = self.mark;
                    self.push(TokenData::DocumentStart, start_mark, end_mark);
                    self.indents.clear();
                    self.seen_document_content = true;
                    continue;
                }
                if self.starts_with("...") && self.peek_at(3).map_or(true, is_blankz_char) {
                    self.unroll_indent(-1);
                    let start_mark = self.mark;
                    self.skip(3);
                    let end_mark = self.mark;
                    self.push(TokenData::DocumentEnd, start_mark, end_mark);
                    self.indents.clear();
                    self.seen_document_content = false;
                    continue;
                }
                if self.peek() == Some('%') && !self.seen_document_content {
                    self.scan_directive()?;
                    continue;
                }
            }

            let column = self.current_column();
            self.scan_node(column)?;
        }
    }

    fn scan_directive(&mut self) -> Result<(), ScannerError> {
        let start_mark = self.mark;
        self.advance(); // '%'
        let name = self.scan_plain_word();
        match name.as_str() {
            "YAML" => {
                self.skip_blanks();
                let major = self.scan_uint_digits();
                if self.peek() == Some('.') {
                    self.advance();
                }
                let minor = self.scan_uint_digits();
                let end_mark = self.mark;
                self.push(
                    TokenData::VersionDirective {
                        major: major.parse().unwrap_or(1),
                        minor: minor.parse().unwrap_or(1),
                    },
                    start_mark,
                    end_mark,
                );
            }
            "TAG" => {
                self.skip_blanks();
                let handle = self.scan_plain_word();
                self.skip_blanks();
                let prefix = self.scan_plain_word();
                let end_mark = self.mark;
                self.push(
                    TokenData::TagDirective { handle, prefix },
                    start_mark,
                    end_mark,
                );
            }
            _ => {}
        }
        while !matches!(self.peek(), None) && !is_break(self.peek()) {
            self.advance();
        }
        Ok(())
    }

    fn skip_blanks(&mut self) {
        while is_blank(self.peek()) {
            self.advance();
        }
    }

    fn scan_plain_word(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if is_blankz(Some(c)) {
                break;
            }
            s.push(c);
            self.advance();
        }
        s
    }

    fn scan_uint_digits(&mut self) -> String {
        let mut s = String::new();
        while is_digit(self.peek()) {
            s.push(self.advance().unwrap());
        }
        s
    }

    /// Scan one node at `column`: an anchor/tag-prefixed scalar, a flow or
    /// block collection, or (if followed by `key:`) the start of a mapping.
    fn scan_node(&mut self, column: i64) -> Result<(), ScannerError> {
        let mut anchor = None;
        let mut tag = None;
        loop {
            match self.peek() {
                Some('&') => anchor = Some(self.scan_anchor_or_alias(true)?),
                Some('!') => tag = Some(self.scan_tag()?),
                _ => break,
            }
            self.skip_whitespace_and_comments()?;
        }
        if let Some((value, start_mark, end_mark)) = anchor {
            self.push(TokenData::Anchor { value }, start_mark, end_mark);
        }
        if let Some((handle, suffix, start_mark, end_mark)) = tag {
            self.push(TokenData::Tag { handle, suffix }, start_mark, end_mark);
        }

        match self.peek() {
            Some('*') => {
                let (value, start_mark, end_mark) = self.scan_anchor_or_alias(false)?;
                self.push(TokenData::Alias { value }, start_mark, end_mark);
                Ok(())
            }
            Some('-') if is_blankz(self.peek_at(1)) && self.flow_level == 0 => {
                self.scan_block_sequence(column)
            }
            Some('[') => self.scan_flow_sequence(),
            Some('{') => self.scan_flow_mapping(),
            Some('|') | Some('>') => self.scan_block_scalar(),
            Some('\'') => self.scan_single_or_mapping(column, true),
            Some('"') => self.scan_single_or_mapping(column, false),
            Some(',') | Some(']') | Some('}') if self.flow_level > 0 => Ok(()),
            None => Ok(()),
            _ => self.scan_plain_or_mapping(column),
        }
    }

    fn scan_anchor_or_alias(
        &mut self,
        is_anchor: bool,
    ) -> Result<(String, Mark, Mark), ScannerError> {
        let start_mark = self.mark;
        self.advance();
        let mut value = String::new();
        while is_alpha(self.peek()) {
            value.push(self.advance().unwrap());
        }
        if value.is_empty() {
            return Err(problem(
                if is_anchor {
                    "while scanning an anchor, did not find expected alphabetic or numeric character"
                } else {
                    "while scanning an alias, did not find expected alphabetic or numeric character"
                },
                self.mark,
            ));
        }
        Ok((value, start_mark, self.mark))
    }

    fn scan_tag(&mut self) -> Result<(String, String, Mark, Mark), ScannerError> {
        let start_mark = self.mark;
        self.advance();
        let mut handle = String::from("!");
        if self.peek() == Some('!') {
            handle.push('!');
            self.advance();
        }
        let mut suffix = String::new();
        while let Some(c) = self.peek() {
            if is_blankz(Some(c)) || is_flow_indicator(Some(c)) {
                break;
            }
            suffix.push(c);
            self.advance();
        }
        Ok((handle, suffix, start_mark, self.mark))
    }

    fn scan_block_sequence(&mut self, column: i64) -> Result<(), ScannerError> {
        let start_mark = self.mark;
        self.roll_indent(column, start_mark, true);
        self.push(TokenData::BlockEntry, start_mark, start_mark);
        self.advance(); // '-'
        self.skip_blanks();
        if is_break(self.peek()) || self.peek().is_none() || self.peek() == Some('#') {
            return Ok(());
        }
        let entry_column = self.current_column();
        self.scan_node(entry_column)
    }

    fn scan_flow_sequence(&mut self) -> Result<(), ScannerError> {
        let start_mark = self.mark;
        self.advance();
        self.flow_level += 1;
        self.push(TokenData::FlowSequenceStart, start_mark, start_mark);
        loop {
            self.skip_whitespace_and_comments()?;
            match self.peek() {
                Some(']') => {
                    let m = self.mark;
                    self.advance();
                    self.flow_level -= 1;
                    self.push(TokenData::FlowSequenceEnd, m, self.mark);
                    return Ok(());
                }
                Some(',') => {
                    let m = self.mark;
                    self.advance();
                    self.push(TokenData::FlowEntry, m, self.mark);
                }
                None => {
                    return Err(problem(
                        "while scanning a flow sequence, did not find expected ']'",
                        self.mark,
                    ))
                }
                _ => self.scan_node(self.current_column())?,
            }
        }
    }

    fn scan_flow_mapping(&mut self) -> Result<(), ScannerError> {
        let start_mark = self.mark;
        self.advance();
        self.flow_level += 1;
        self.push(TokenData::FlowMappingStart, start_mark, start_mark);
        loop {
            self.skip_whitespace_and_comments()?;
            match self.peek() {
                Some('}') => {
                    let m = self.mark;
                    self.advance();
                    self.flow_level -= 1;
                    self.push(TokenData::FlowMappingEnd, m, self.mark);
                    return Ok(());
                }
                Some(',') => {
                    let m = self.mark;
                    self.advance();
                    self.push(TokenData::FlowEntry, m, self.mark);
                }
                None => {
                    return Err(problem(
                        "while scanning a flow mapping, did not find expected '}'",
                        self.mark,
                    ))
                }
                _ => self.scan_node(self.current_column())?,
            }
        }
    }

    /// Scans a plain scalar; if it turns out to be followed by `: ` (or
    /// `:<EOF>`), re-frames it as a block or flow mapping key instead.
    fn scan_plain_or_mapping(&mut self, column: i64) -> Result<(), ScannerError> {
        let start_mark = self.mark;
        let value = self.scan_plain_scalar()?;
        self.try_as_key(column, start_mark, value, crate::ScalarStyle::Plain)
    }

    fn scan_single_or_mapping(&mut self, column: i64, single: bool) -> Result<(), ScannerError> {
        let start_mark = self.mark;
        let value = if single {
            self.scan_single_quoted_scalar()?
        } else {
            self.scan_double_quoted_scalar()?
        };
        let style = if single {
            crate::ScalarStyle::SingleQuoted
        } else {
            crate::ScalarStyle::DoubleQuoted
        };
        self.try_as_key(column, start_mark, value, style)
    }

    fn try_as_key(
        &mut self,
        column: i64,
        start_mark: Mark,
        value: String,
        style: crate::ScalarStyle,
    ) -> Result<(), ScannerError> {
        let save = self.pos;
        let save_mark = self.mark;
        self.skip_blanks();
        let is_key = self.peek() == Some(':')
            && (self.peek_at(1).map_or(true, is_blankz_char) || self.flow_level > 0);
        if is_key {
            let colon_mark = self.mark;
            if self.flow_level == 0 {
                self.roll_indent(column, start_mark, false);
            }
            self.push(TokenData::Key, start_mark, start_mark);
            self.push(TokenData::Scalar { value, style }, start_mark, colon_mark);
            self.advance(); // ':'
            let value_mark = self.mark;
            self.push(TokenData::Value, colon_mark, value_mark);
            self.skip_blanks();
            if is_break(self.peek()) || self.peek().is_none() || self.peek() == Some('#') {
                return Ok(());
            }
            let value_column = self.current_column();
            return self.scan_node(value_column);
        }
        self.pos = save;
        self.mark = save_mark;
        let end_mark = self.mark;
        self.push(TokenData::Scalar { value, style }, start_mark, end_mark);
        Ok(())
    }

    fn scan_plain_scalar(&mut self) -> Result<String, ScannerError> {
        let mut value = String::new();
        let mut trailing_ws = String::new();
        loop {
            match self.peek() {
                None => break,
                Some(c) if is_break(Some(c)) => break,
                Some('#') if trailing_ws.is_empty() && !value.is_empty() => break,
                Some('#') if value.is_empty() => break,
                Some(':') if self.peek_at(1).map_or(true, is_blankz_char) => break,
                Some(':') if self.flow_level > 0 => break,
                Some(c) if self.flow_level > 0 && is_flow_indicator(Some(c)) => break,
                Some(' ') | Some('\t') => {
                    trailing_ws.push(self.advance().unwrap());
                    continue;
                }
                Some(c) => {
                    if !trailing_ws.is_empty() {
                        value.push(' ');
                        trailing_ws.clear();
                    }
                    value.push(c);
                    self.advance();
                }
            }
        }
        Ok(value)
    }

    fn scan_single_quoted_scalar(&mut self) -> Result<String, ScannerError> {
        let start_mark = self.mark;
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(problem(
                        "while scanning a quoted scalar, found unexpected end of stream",
                        start_mark,
                    ))
                }
                Some('\'') => {
                    self.advance();
                    if self.peek() == Some('\'') {
                        value.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) if is_break(Some(c)) => {
                    self.advance();
                    self.skip_blanks();
                    value.push(' ');
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        Ok(value)
    }

    fn scan_double_quoted_scalar(&mut self) -> Result<String, ScannerError> {
        let start_mark = self.mark;
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(problem(
                        "while scanning a quoted scalar, found unexpected end of stream",
                        start_mark,
                    ))
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('0') => value.push('\0'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('b') => value.push('\u{8}'),
                        Some('a') => value.push('\u{7}'),
                        Some(c) if is_break(Some(c)) => {
                            self.skip_blanks();
                        }
                        Some('x') => {
                            let code = self.scan_hex_digits(2)?;
                            value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        }
                        Some('u') => {
                            let code = self.scan_hex_digits(4)?;
                            value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        }
                        Some('U') => {
                            let code = self.scan_hex_digits(8)?;
                            value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        }
                        Some(c) => value.push(c),
                        None => {
                            return Err(problem(
                                "while scanning a quoted scalar, found unexpected end of stream",
                                start_mark,
                            ))
                        }
                    }
                }
                Some(c) if is_break(Some(c)) => {
                    self.advance();
                    self.skip_blanks();
                    value.push(' ');
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        Ok(value)
    }

    fn scan_hex_digits(&mut self, n: usize) -> Result<u32, ScannerError> {
        let mut s = String::new();
        for _ in 0..n {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    s.push(c);
                    self.advance();
                }
                _ => {
                    return Err(problem(
                        "while scanning an escape sequence, did not find expected hexadecimal digit",
                        self.mark,
                    ))
                }
            }
        }
        u32::from_str_radix(&s, 16).map_err(|_| problem("invalid hexadecimal escape", self.mark))
    }

    /// Literal (`|`) or folded (`>`) block scalar, with optional chomping
    /// (`-`/`+`) and explicit indentation indicators.
    fn scan_block_scalar(&mut self) -> Result<(), ScannerError> {
        let start_mark = self.mark;
        let folded = self.peek() == Some('>');
        self.advance();
        let mut chomping = 0i8; // -1 strip, 0 clip, 1 keep
        let mut explicit_indent: Option<i64> = None;
        loop {
            match self.peek() {
                Some('-') => {
                    chomping = -1;
                    self.advance();
                }
                Some('+') => {
                    chomping = 1;
                    self.advance();
                }
                Some(c) if c.is_ascii_digit() => {
                    explicit_indent = Some((c as i64 - '0' as i64) + self.current_column());
                    self.advance();
                }
                _ => break,
            }
        }
        while !matches!(self.peek(), None) && !is_break(self.peek()) {
            self.advance();
        }
        let parent_indent = *self.indents.last().unwrap_or(&-1);
        let mut lines: Vec<String> = Vec::new();
        let mut base_indent: Option<i64> = explicit_indent;
        loop {
            if self.peek().is_none() {
                break;
            }
            let mut col = 0i64;
            let mut probe = self.pos;
            while matches!(self.chars.get(probe), Some(' ')) {
                probe += 1;
                col += 1;
            }
            let blank_line = matches!(self.chars.get(probe), Some('\n') | Some('\r') | None);
            if !blank_line {
                if let Some(b) = base_indent {
                    if col < b {
                        break;
                    }
                } else {
                    if col <= parent_indent {
                        break;
                    }
                    base_indent = Some(col);
                }
            }
            let indent = base_indent.unwrap_or(col).max(parent_indent + 1);
            let skip_n = if blank_line { col.min(indent) } else { indent };
            for _ in 0..skip_n {
                self.advance();
            }
            let mut line = String::new();
            while !matches!(self.peek(), None) && !is_break(self.peek()) {
                line.push(self.advance().unwrap());
            }
            if is_break(self.peek()) {
                self.advance();
            }
            lines.push(line);
        }
        let mut value = if folded {
            fold_lines(&lines)
        } else {
            lines.join("\n")
        };
        match chomping {
            -1 => {}
            1 => value.push('\n'),
            _ => {
                if !lines.is_empty() {
                    value.push('\n');
                }
            }
        }
        let end_mark = self.mark;
        self.push(
            TokenData::Scalar {
                value,
                style: if folded {
                    crate::ScalarStyle::Folded
                } else {
                    crate::ScalarStyle::Literal
                },
            },
            start_mark,
            end_mark,
        );
        Ok(())
    }
}

fn fold_lines(lines: &[String]) -> String {
    let mut out = String::new();
    let mut prev_blank = true;
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            if line.is_empty() || prev_blank {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        out.push_str(line);
        prev_blank = line.is_empty();
    }
    out
}
