//! The lexical tokenizer (component B).
//!
//! Grounded on `original_source/libraries/libim/text/tokenizer.h` and
//! `impl/tokenizer_p.h`: this reproduces the same operation surface
//! (`getNextToken`/`peekNextToken`/`skipNextTokenIf`/`getSpaceDelimitedString`/
//! `setReportEol`/...) over safe Rust, with a `thiserror`-based [`SyntaxError`]
//! instead of C++ exceptions.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::SyntaxError;

bitflags! {
    /// A mask over [`TokenType`] variants, used by `skip_if`/`skip_if_not`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TokenTypeMask: u16 {
        const INVALID       = 1 << 0;
        const END_OF_FILE    = 1 << 1;
        const END_OF_LINE    = 1 << 2;
        const IDENTIFIER     = 1 << 3;
        const STRING         = 1 << 4;
        const PUNCTUATOR     = 1 << 5;
        const INTEGER        = 1 << 6;
        const HEX_INTEGER    = 1 << 7;
        const OCT_INTEGER    = 1 << 8;
        const FLOAT_NUMBER   = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Invalid,
    EndOfFile,
    EndOfLine,
    Identifier,
    String,
    Punctuator,
    Integer,
    HexInteger,
    OctInteger,
    FloatNumber,
}

impl TokenType {
    fn mask(self) -> TokenTypeMask {
        match self {
            Self::Invalid => TokenTypeMask::INVALID,
            Self::EndOfFile => TokenTypeMask::END_OF_FILE,
            Self::EndOfLine => TokenTypeMask::END_OF_LINE,
            Self::Identifier => TokenTypeMask::IDENTIFIER,
            Self::String => TokenTypeMask::STRING,
            Self::Punctuator => TokenTypeMask::PUNCTUATOR,
            Self::Integer => TokenTypeMask::INTEGER,
            Self::HexInteger => TokenTypeMask::HEX_INTEGER,
            Self::OctInteger => TokenTypeMask::OCT_INTEGER,
            Self::FloatNumber => TokenTypeMask::FLOAT_NUMBER,
        }
    }
}

/// A location within a parsed text resource, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseLocation {
    pub file: Option<String>,
    pub first_line: usize,
    pub first_col: usize,
    pub last_line: usize,
    pub last_col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: TokenType,
    pub value: String,
    pub location: ParseLocation,
}

impl Token {
    fn eof(loc: ParseLocation) -> Self {
        Self {
            ty: TokenType::EndOfFile,
            value: String::new(),
            location: loc,
        }
    }

    /// Parses this token's text as a number of type `T`. Works for both the
    /// `Integer`/`HexInteger`/`OctInteger` and `FloatNumber` token types.
    ///
    /// Hex and octal literals are re-rendered as decimal text before parsing, since
    /// `T: FromStr` has no radix-aware entry point generic over arbitrary integer
    /// widths.
    pub fn get_number<T: FromStr>(&self) -> Result<T, SyntaxError>
    where
        T::Err: fmt::Display,
    {
        let decimal;
        let text = match self.ty {
            TokenType::HexInteger => {
                let digits = self
                    .value
                    .trim_start_matches('-')
                    .trim_start_matches("0x")
                    .trim_start_matches("0X");
                let value = u64::from_str_radix(digits, 16).map_err(|e| {
                    SyntaxError::new(
                        format!("invalid hex number {:?}: {e}", self.value),
                        self.location.clone(),
                    )
                })?;
                decimal = if self.value.starts_with('-') {
                    format!("-{value}")
                } else {
                    value.to_string()
                };
                decimal.as_str()
            }
            TokenType::OctInteger => {
                let digits = self.value.trim_start_matches('-').trim_start_matches('0');
                let value = if digits.is_empty() {
                    0
                } else {
                    u64::from_str_radix(digits, 8).map_err(|e| {
                        SyntaxError::new(
                            format!("invalid octal number {:?}: {e}", self.value),
                            self.location.clone(),
                        )
                    })?
                };
                decimal = if self.value.starts_with('-') {
                    format!("-{value}")
                } else {
                    value.to_string()
                };
                decimal.as_str()
            }
            _ => self.value.as_str(),
        };
        text.parse::<T>().map_err(|e| {
            SyntaxError::new(
                format!("invalid number {:?}: {e}", self.value),
                self.location.clone(),
            )
        })
    }
}

/// Lexical tokenizer over a complete in-memory text resource.
///
/// The tokenizer does not own a stream directly; callers load the full text first
/// (text resources are small enough in practice, and this avoids threading seek
/// semantics through the lexer).
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    file: Option<String>,
    report_eol: bool,
    current: Token,
    peeked: Option<(Token, usize, usize, usize)>,
}

impl Tokenizer {
    pub fn new(source: &str, file: Option<String>) -> Self {
        let loc = ParseLocation {
            file: file.clone(),
            first_line: 1,
            first_col: 1,
            last_line: 1,
            last_col: 1,
        };
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            file,
            report_eol: false,
            current: Token::eof(loc),
            peeked: None,
        }
    }

    pub fn report_eol(&self) -> bool {
        self.report_eol
    }

    pub fn set_report_eol(&mut self, report: bool) {
        self.report_eol = report;
    }

    pub fn current_token(&self) -> &Token {
        &self.current
    }

    fn loc(&self) -> ParseLocation {
        ParseLocation {
            file: self.file.clone(),
            first_line: self.line,
            first_col: self.col,
            last_line: self.line,
            last_col: self.col,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c == ' ' || c == '\t' || c == '\x0c' => {
                    self.advance();
                }
                Some('\r') => {
                    self.advance();
                }
                Some('\n') if !self.report_eol => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_ident_lead(c: char) -> bool {
        c.is_alphabetic() || c == '_' || c == '$'
    }

    fn is_ident_cont(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '$' || c == '-'
    }

    /// Lexes the next raw token without consuming the peek cache.
    fn lex(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace_and_comments();

        let start = self.loc();
        let Some(c) = self.peek_char() else {
            return Ok(Token::eof(start));
        };

        if c == '\n' {
            self.advance();
            return Ok(Token {
                ty: TokenType::EndOfLine,
                value: "\n".to_owned(),
                location: start,
            });
        }

        if c == '"' {
            return self.lex_string(start);
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).is_some_and(|n| n.is_ascii_digit()))
            || (c == '-' && self.peek_char_at(1).is_some_and(|n| n.is_ascii_digit() || n == '.'))
        {
            return self.lex_number(start);
        }

        if Self::is_ident_lead(c) {
            return self.lex_identifier(start);
        }

        self.advance();
        Ok(Token {
            ty: TokenType::Punctuator,
            value: c.to_string(),
            location: start,
        })
    }

    fn lex_identifier(&mut self, start: ParseLocation) -> Result<Token, SyntaxError> {
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if Self::is_ident_cont(c) {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(Token {
            ty: TokenType::Identifier,
            value: s,
            location: start,
        })
    }

    fn lex_string(&mut self, start: ParseLocation) -> Result<Token, SyntaxError> {
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(SyntaxError::new("unterminated string literal", start));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\n') => {
                    return Err(SyntaxError::new(
                        "unescaped end of line in string literal",
                        start,
                    ));
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some('"') => s.push('"'),
                        Some('\'') => s.push('\''),
                        Some('\\') => s.push('\\'),
                        Some('\n') => {}
                        Some(other) => s.push(other),
                        None => {
                            return Err(SyntaxError::new(
                                "unterminated escape in string literal",
                                start,
                            ));
                        }
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token {
            ty: TokenType::String,
            value: s,
            location: start,
        })
    }

    fn lex_number(&mut self, start: ParseLocation) -> Result<Token, SyntaxError> {
        let mut s = String::new();
        if self.peek_char() == Some('-') {
            s.push('-');
            self.advance();
        }

        if self.peek_char() == Some('0')
            && matches!(self.peek_char_at(1), Some('x') | Some('X'))
        {
            s.push('0');
            self.advance();
            s.push('x');
            self.advance();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_hexdigit() {
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return Ok(Token {
                ty: TokenType::HexInteger,
                value: s,
                location: start,
            });
        }

        let mut ty = TokenType::Integer;
        if self.peek_char() == Some('.') {
            s.push('0');
        }
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') {
            ty = TokenType::FloatNumber;
            s.push('.');
            self.advance();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            ty = TokenType::FloatNumber;
            s.push('e');
            self.advance();
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                s.push(self.advance().expect("checked by matches!"));
            }
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        Ok(Token {
            ty,
            value: s,
            location: start,
        })
    }

    /// Produces the next token, optionally lowercasing identifiers.
    pub fn get_next_token(&mut self, lowercased: bool) -> Result<&Token, SyntaxError> {
        if let Some((tok, pos, line, col)) = self.peeked.take() {
            self.pos = pos;
            self.line = line;
            self.col = col;
            self.current = tok;
        } else {
            self.current = self.lex()?;
        }
        if lowercased && self.current.ty == TokenType::Identifier {
            self.current.value = self.current.value.to_lowercase();
        }
        Ok(&self.current)
    }

    /// Returns the next token without consuming it.
    pub fn peek_next_token(&mut self, lowercased: bool) -> Result<&Token, SyntaxError> {
        if self.peeked.is_none() {
            let before = (self.pos, self.line, self.col);
            let tok = self.lex()?;
            let after = (self.pos, self.line, self.col);
            // Cache the token together with the cursor state *after* lexing it, then
            // rewind the live cursor so a second peek (or ordinary lexing resuming
            // from here) sees the same input again.
            self.peeked = Some((tok, after.0, after.1, after.2));
            self.pos = before.0;
            self.line = before.1;
            self.col = before.2;
        }
        let (tok, ..) = self.peeked.as_mut().expect("just populated");
        if lowercased && tok.ty == TokenType::Identifier {
            tok.value = tok.value.to_lowercase();
        }
        Ok(&self.peeked.as_ref().expect("just populated").0)
    }

    pub fn skip_next_token(&mut self) -> Result<(), SyntaxError> {
        self.get_next_token(false)?;
        Ok(())
    }

    pub fn skip_next_token_if(&mut self, mask: TokenTypeMask) -> Result<bool, SyntaxError> {
        let tok = self.peek_next_token(false)?;
        if mask.contains(tok.ty.mask()) {
            self.skip_next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn skip_next_token_if_not(&mut self, mask: TokenTypeMask) -> Result<bool, SyntaxError> {
        let tok = self.peek_next_token(false)?;
        if !mask.contains(tok.ty.mask()) {
            self.skip_next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn skip_to_next_line(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                self.advance();
                break;
            }
            self.advance();
        }
        self.peeked = None;
    }

    pub fn get_identifier(&mut self) -> Result<String, SyntaxError> {
        let tok = self.get_next_token(false)?;
        if tok.ty != TokenType::Identifier {
            return Err(SyntaxError::new(
                format!("expected identifier, got {:?}", tok.value),
                tok.location.clone(),
            ));
        }
        Ok(tok.value.clone())
    }

    pub fn get_string_literal(&mut self) -> Result<String, SyntaxError> {
        let tok = self.get_next_token(false)?;
        if tok.ty != TokenType::String {
            return Err(SyntaxError::new(
                format!("expected string literal, got {:?}", tok.value),
                tok.location.clone(),
            ));
        }
        Ok(tok.value.clone())
    }

    /// Reads characters up to (not including) the next whitespace, returning them
    /// joined as a single "word". Used for bareword filenames in text resources.
    pub fn get_space_delimited_string(
        &mut self,
        throw_if_empty: bool,
    ) -> Result<String, SyntaxError> {
        self.get_delimited_string_impl(throw_if_empty, |c| c.is_whitespace())
    }

    pub fn get_delimited_string(
        &mut self,
        is_delim: impl Fn(char) -> bool,
    ) -> Result<String, SyntaxError> {
        self.get_delimited_string_impl(true, is_delim)
    }

    fn get_delimited_string_impl(
        &mut self,
        throw_if_empty: bool,
        is_delim: impl Fn(char) -> bool,
    ) -> Result<String, SyntaxError> {
        self.peeked = None;
        while matches!(self.peek_char(), Some(' ') | Some('\t')) {
            self.advance();
        }
        let start = self.loc();
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if is_delim(c) {
                break;
            }
            s.push(c);
            self.advance();
        }
        if throw_if_empty && s.is_empty() {
            return Err(SyntaxError::new("expected non-empty string", start));
        }
        self.current = Token {
            ty: TokenType::String,
            value: s.clone(),
            location: start,
        };
        Ok(s)
    }

    pub fn get_string(&mut self, len: usize) -> Result<String, SyntaxError> {
        self.peeked = None;
        let start = self.loc();
        let mut s = String::with_capacity(len);
        for _ in 0..len {
            match self.advance() {
                Some(c) => s.push(c),
                None => {
                    return Err(SyntaxError::new(
                        format!("unexpected eof reading {len}-char string"),
                        start,
                    ));
                }
            }
        }
        Ok(s)
    }

    pub fn assert_identifier(&mut self, id: &str) -> Result<(), SyntaxError> {
        let tok = self.get_next_token(true)?;
        if tok.ty != TokenType::Identifier || !tok.value.eq_ignore_ascii_case(id) {
            return Err(SyntaxError::new(
                format!("expected identifier {id:?}, got {:?}", tok.value),
                tok.location.clone(),
            ));
        }
        Ok(())
    }

    pub fn assert_punctuator(&mut self, punc: &str) -> Result<(), SyntaxError> {
        let tok = self.get_next_token(false)?;
        if tok.ty != TokenType::Punctuator || tok.value != punc {
            return Err(SyntaxError::new(
                format!("expected punctuator {punc:?}, got {:?}", tok.value),
                tok.location.clone(),
            ));
        }
        Ok(())
    }

    /// Captures raw text from the current position up to (not including) the next
    /// line whose first word is the identifier `section` followed by `:`, or end of
    /// file. Used by formats with a handful of typed leading sections and an open
    /// tail of sections this crate has no recovered grammar for (see
    /// `world::ndy`): those are round-tripped as opaque text instead of guessed at.
    pub fn capture_until_next_section(&mut self) -> String {
        self.peeked = None;
        let mut out = String::new();
        loop {
            if self.at_section_boundary() || self.peek_char().is_none() {
                break;
            }
            while let Some(c) = self.peek_char() {
                out.push(c);
                self.advance();
                if c == '\n' {
                    break;
                }
            }
        }
        out
    }

    fn at_section_boundary(&self) -> bool {
        let mut i = self.pos;
        while matches!(self.chars.get(i), Some(' ') | Some('\t') | Some('\r')) {
            i += 1;
        }
        let ident_start = i;
        while self.chars.get(i).is_some_and(|c| Self::is_ident_cont(*c)) {
            i += 1;
        }
        if ident_start == i {
            return false;
        }
        let ident: String = self.chars[ident_start..i].iter().collect();
        if !ident.eq_ignore_ascii_case("section") {
            return false;
        }
        while matches!(self.chars.get(i), Some(' ') | Some('\t')) {
            i += 1;
        }
        self.chars.get(i) == Some(&':')
    }

    pub fn assert_eof(&mut self) -> Result<(), SyntaxError> {
        let tok = self.get_next_token(false)?;
        if tok.ty != TokenType::EndOfFile {
            return Err(SyntaxError::new(
                format!("expected end of file, got {:?}", tok.value),
                tok.location.clone(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_change_next_sequence() {
        let mut t = Tokenizer::new("foo bar", None);
        let peeked = t.peek_next_token(false).unwrap().value.clone();
        assert_eq!(peeked, "foo");
        let next = t.get_next_token(false).unwrap().value.clone();
        assert_eq!(next, "foo");
        let next2 = t.get_next_token(false).unwrap().value.clone();
        assert_eq!(next2, "bar");
    }

    #[test]
    fn numeric_literal_fidelity() {
        let mut t = Tokenizer::new("42 -3 3.5 0x20 .25", None);
        assert_eq!(t.get_next_token(false).unwrap().get_number::<i64>().unwrap(), 42);
        assert_eq!(t.get_next_token(false).unwrap().get_number::<i64>().unwrap(), -3);
        assert_eq!(t.get_next_token(false).unwrap().get_number::<f64>().unwrap(), 3.5);
        assert_eq!(t.get_next_token(false).unwrap().get_number::<u32>().unwrap(), 0x20);
        assert_eq!(t.get_next_token(false).unwrap().get_number::<f64>().unwrap(), 0.25);
    }

    #[test]
    fn comment_is_skipped() {
        let mut t = Tokenizer::new("foo # a comment\nbar", None);
        assert_eq!(t.get_next_token(false).unwrap().value, "foo");
        t.set_report_eol(true);
        assert_eq!(t.get_next_token(false).unwrap().ty, TokenType::EndOfLine);
        assert_eq!(t.get_next_token(false).unwrap().value, "bar");
    }

    #[test]
    fn string_literal_escapes() {
        let mut t = Tokenizer::new(r#""hello\nworld""#, None);
        assert_eq!(t.get_string_literal().unwrap(), "hello\nworld");
    }

    #[test]
    fn identifier_lowercasing() {
        let mut t = Tokenizer::new("FooBar", None);
        assert_eq!(t.get_next_token(true).unwrap().value, "foobar");
    }

    #[test]
    fn capture_until_next_section_stops_before_boundary() {
        let mut t = Tokenizer::new("line one\nline two\nSECTION: NEXT\nrest", None);
        let raw = t.capture_until_next_section();
        assert_eq!(raw, "line one\nline two\n");
        t.assert_identifier("section").unwrap();
    }

    #[test]
    fn capture_until_next_section_stops_at_eof() {
        let mut t = Tokenizer::new("only content here", None);
        let raw = t.capture_until_next_section();
        assert_eq!(raw, "only content here");
    }
}
