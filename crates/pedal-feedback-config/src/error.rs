use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Line/column position of a node or entry in the source KDL (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub len: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize, len: usize) -> Self {
        Self {
            line,
            column,
            offset,
            len,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Why a key node in the `keys` block was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKeyReason {
    /// The identifier is empty or longer than one character
    NotSingleCharacter,
    /// The identifier has an upper-case form and is not lower-case
    NotLowercase,
    /// The same identifier appears more than once
    Duplicate,
}

impl fmt::Display for InvalidKeyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidKeyReason::NotSingleCharacter => write!(f, "must be a single character"),
            InvalidKeyReason::NotLowercase => write!(f, "must be lower-case"),
            InvalidKeyReason::Duplicate => write!(f, "is defined more than once"),
        }
    }
}

/// A rejected key identifier together with where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKeyInfo {
    pub key: String,
    pub reason: InvalidKeyReason,
    pub location: SourceLocation,
}

impl fmt::Display for InvalidKeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {} (at {})", self.key, self.reason, self.location)
    }
}

fn format_invalid_keys(keys: &[InvalidKeyInfo]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(pedal_feedback::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(pedal_feedback::config::invalid))]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(pedal_feedback::config::missing_field))]
    MissingField { field: String },

    #[error("Invalid key(s) in keys block: {}", format_invalid_keys(.invalid_keys))]
    #[diagnostic(
        code(pedal_feedback::config::invalid_keys),
        help("Key identifiers are single lower-case characters, e.g. `a label=\"Left Pedal\"`")
    )]
    InvalidKeys { invalid_keys: Vec<InvalidKeyInfo> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
