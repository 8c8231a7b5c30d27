//! Error types for hostcmd core

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Numeric status codes shared by the registry and the parser.
///
/// Ordinals 0..=7 are the wire-visible codes of the protocol; the remaining
/// ones cover runtime conditions that only the parser reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum ErrorCode {
    #[default]
    None = 0,
    BadLength = 1,
    BadPcode = 2,
    DuplicateName = 3,
    RequiredMissing = 4,
    InvalidParamSpec = 5,
    ParamTooLong = 6,
    MissingQuotes = 7,
    UnknownCommand = 8,
    Timeout = 9,
    Source = 10,
}

impl ErrorCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human readable description, as reported to hosts
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::None => "no error",
            ErrorCode::BadLength => "bad parameter length in definition",
            ErrorCode::BadPcode => "bad character in parameter definition",
            ErrorCode::DuplicateName => "duplicate command name",
            ErrorCode::RequiredMissing => "required parameter missing",
            ErrorCode::InvalidParamSpec => "invalid optional-marker placement in definition",
            ErrorCode::ParamTooLong => "parameter length exceeded",
            ErrorCode::MissingQuotes => "missing quotes on quoted-string parameter",
            ErrorCode::UnknownCommand => "unknown command",
            ErrorCode::Timeout => "scan time budget exceeded",
            ErrorCode::Source => "byte source failure",
        }
    }

    /// Short upper-case tag used in `-ERR` replies
    pub fn tag(self) -> &'static str {
        match self {
            ErrorCode::None => "NONE",
            ErrorCode::BadLength => "BAD_LENGTH",
            ErrorCode::BadPcode => "BAD_PCODE",
            ErrorCode::DuplicateName => "DUPLICATE",
            ErrorCode::RequiredMissing => "REQUIRED_MISSING",
            ErrorCode::InvalidParamSpec => "INVALID_SPEC",
            ErrorCode::ParamTooLong => "TOO_LONG",
            ErrorCode::MissingQuotes => "MISSING_QUOTES",
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Source => "SOURCE",
        }
    }

    pub fn is_error(self) -> bool {
        self != ErrorCode::None
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors raised while defining commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Duplicate command name: {0}")]
    DuplicateName(String),

    #[error("Bad parameter length {length:?} (allowed 1..={max})")]
    BadLength { length: Option<usize>, max: usize },

    #[error("Bad character {0:?} in parameter definition")]
    BadPcode(char),

    #[error("Optional marker must follow at least one parameter and appear once")]
    InvalidParamSpec,

    #[error("No command defined yet")]
    NoCommand,
}

impl DefinitionError {
    /// Status code this error is reported under
    pub fn code(&self) -> ErrorCode {
        match self {
            DefinitionError::DuplicateName(_) => ErrorCode::DuplicateName,
            DefinitionError::BadLength { .. } => ErrorCode::BadLength,
            DefinitionError::BadPcode(_) => ErrorCode::BadPcode,
            DefinitionError::InvalidParamSpec | DefinitionError::NoCommand => {
                ErrorCode::InvalidParamSpec
            }
        }
    }
}

impl From<&DefinitionError> for ErrorCode {
    fn from(err: &DefinitionError) -> Self {
        err.code()
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, DefinitionError>;
