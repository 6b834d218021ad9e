//! Crate-wide error aggregation.
//!
//! Mirrors the split the teacher uses in `game_data::Error`: small per-concern error
//! enums (one per module), aggregated into a top-level [`Error`] via `#[from]`.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::tokenizer::ParseLocation;

/// Any fallible library operation returns this.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// I/O failure, unexpected short read, or an invalid magic/version in a binary header.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unexpected eof reading {what}: wanted {expected} bytes, got {got}")]
    UnexpectedEof {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("bad magic for {format}: expected {expected:?}, got {got:?}")]
    BadMagic {
        format: &'static str,
        expected: [u8; 4],
        got: [u8; 4],
    },
    #[error("unsupported {format} version: {version:#x}")]
    BadVersion { format: &'static str, version: u32 },
}

/// A lexical or grammar error at a specific location in a text resource.
#[derive(Debug, Error)]
#[error("{location}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub location: ParseLocation,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, location: ParseLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// A lexical error raised by the tokenizer itself (unterminated string, bad
/// escape, malformed number) rather than by a grammar-level expectation such as
/// `assert_identifier`. Structurally identical to [`SyntaxError`]; kept as its own
/// `Error` variant purely so callers can match on lexical failures specifically
/// without also catching every grammar mismatch.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct TokenizerError(#[from] pub SyntaxError);

/// A structural invariant violated in an otherwise syntactically valid file.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{what}: expected {expected}, got {got}")]
    Mismatch {
        what: &'static str,
        expected: String,
        got: String,
    },
    #[error("index {index} out of range (len {len}) in {what}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("invalid color format: {0}")]
    InvalidColorFormat(String),
    #[error("mipmap size mismatch: expected {expected} bytes, buffer has {got}")]
    MipmapSizeMismatch { expected: usize, got: usize },
    #[error("unknown cog message name {0:?}")]
    UnknownMessage(String),
    #[error("unknown cog symbol type {0:?}")]
    UnknownSymbolType(String),
}

/// An invalid argument at the library surface.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("{what} must not be empty")]
    Empty { what: &'static str },
    #[error("{what} out of range: {value} (valid range {min}..={max})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("path too long for GOB entry (max 127 bytes): {0:?}")]
    PathTooLong(String),
    #[error("mismatched cel dimensions/format: existing {existing}, new {new}")]
    CelMismatch { existing: String, new: String },
}

impl fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file.as_deref().unwrap_or("<mem>"),
            self.first_line,
            self.first_col
        )
    }
}
