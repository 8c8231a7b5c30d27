//! Command and parameter definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter type, without its length attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Bool,
    Byte,
    Int,
    Float,
    String,
    QuotedString,
}

impl ParamKind {
    /// Definition-language code for this kind
    pub fn pcode(self) -> char {
        match self {
            ParamKind::Bool => 'b',
            ParamKind::Byte => 'c',
            ParamKind::Int => 'd',
            ParamKind::Float => 'f',
            ParamKind::String => 's',
            ParamKind::QuotedString => 'q',
        }
    }

    pub fn from_pcode(code: char) -> Option<Self> {
        match code {
            'b' => Some(ParamKind::Bool),
            'c' => Some(ParamKind::Byte),
            'd' => Some(ParamKind::Int),
            'f' => Some(ParamKind::Float),
            's' => Some(ParamKind::String),
            'q' => Some(ParamKind::QuotedString),
            _ => None,
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, ParamKind::String | ParamKind::QuotedString)
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Bool => "bool",
            ParamKind::Byte => "byte",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::String => "string",
            ParamKind::QuotedString => "quoted-string",
        };
        f.write_str(name)
    }
}

/// A single declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "max_len", rename_all = "snake_case")]
pub enum ParamSpec {
    Bool,
    Byte,
    Int,
    Float,
    /// Bare string: no whitespace, at most `max_len` bytes kept
    Str(usize),
    /// Quoted string: `"..."` or `'...'`, at most `max_len` bytes kept
    QuotedStr(usize),
}

impl ParamSpec {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamSpec::Bool => ParamKind::Bool,
            ParamSpec::Byte => ParamKind::Byte,
            ParamSpec::Int => ParamKind::Int,
            ParamSpec::Float => ParamKind::Float,
            ParamSpec::Str(_) => ParamKind::String,
            ParamSpec::QuotedStr(_) => ParamKind::QuotedString,
        }
    }

    /// Length cap, for string kinds only
    pub fn max_len(&self) -> Option<usize> {
        match self {
            ParamSpec::Str(len) | ParamSpec::QuotedStr(len) => Some(*len),
            _ => None,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, ParamSpec::QuotedStr(_))
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_len() {
            Some(len) => write!(f, "{}{}", len, self.kind().pcode()),
            None => write!(f, "{}", self.kind().pcode()),
        }
    }
}

/// Stable handle of a registered command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CommandId(pub(crate) usize);

impl CommandId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered command and its parameter schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    name: String,
    params: Vec<ParamSpec>,
    optional_start: Option<usize>,
}

impl CommandSpec {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            optional_start: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&ParamSpec> {
        self.params.get(index)
    }

    /// Index of the first optional parameter, if any
    pub fn optional_start(&self) -> Option<usize> {
        self.optional_start
    }

    pub fn is_optional(&self, index: usize) -> bool {
        self.optional_start.map_or(false, |start| index >= start)
    }

    /// Number of parameters a line must carry
    pub fn required_count(&self) -> usize {
        self.optional_start
            .map_or(self.params.len(), |start| start.min(self.params.len()))
    }

    pub fn matches(&self, name: &[u8]) -> bool {
        self.name.as_bytes().eq_ignore_ascii_case(name)
    }

    pub(crate) fn push(&mut self, param: ParamSpec) {
        self.params.push(param);
    }

    /// Returns false if the optional region was already set
    pub(crate) fn mark_optional(&mut self) -> bool {
        if self.optional_start.is_some() {
            return false;
        }
        self.optional_start = Some(self.params.len());
        true
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if self.optional_start == Some(i) {
                f.write_str(" ?")?;
            }
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcode_round_trip() {
        for code in ['b', 'c', 'd', 'f', 's', 'q'] {
            assert_eq!(ParamKind::from_pcode(code).map(ParamKind::pcode), Some(code));
        }
        assert_eq!(ParamKind::from_pcode('x'), None);
        assert_eq!(ParamKind::from_pcode('B'), None);
    }

    #[test]
    fn test_required_count() {
        let mut cmd = CommandSpec::new("CO1");
        cmd.push(ParamSpec::Int);
        assert!(cmd.mark_optional());
        assert!(!cmd.mark_optional());
        cmd.push(ParamSpec::Int);

        assert_eq!(cmd.required_count(), 1);
        assert!(!cmd.is_optional(0));
        assert!(cmd.is_optional(1));
        assert_eq!(cmd.to_string(), "CO1 d ? d");
    }

    #[test]
    fn test_name_matching_ignores_case() {
        let cmd = CommandSpec::new("Cmd1");
        assert!(cmd.matches(b"cMD1"));
        assert!(!cmd.matches(b"cmd"));
    }

    #[test]
    fn test_param_spec_serializes_with_length() {
        let json = serde_json::to_value(ParamSpec::Str(8)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "str", "max_len": 8}));
        assert_eq!(ParamSpec::QuotedStr(3).to_string(), "3q");
    }
}
