//! Typed interpretation of raw parameter tokens
//!
//! Decoders never fail: malformed input yields the type's zero value.

use hostcmd_core::ParamKind;
use serde::{Serialize, Serializer};

/// A decoded parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Byte(u8),
    Int(i32),
    Float(f32),
    Str(Vec<u8>),
}

impl ParamValue {
    /// Decode `token` as declared by `kind`
    pub fn decode(kind: ParamKind, token: &[u8]) -> Self {
        match kind {
            ParamKind::Bool => ParamValue::Bool(parse_bool(token)),
            ParamKind::Byte => ParamValue::Byte(parse_byte(token)),
            ParamKind::Int => ParamValue::Int(parse_int(token)),
            ParamKind::Float => ParamValue::Float(parse_float(token)),
            ParamKind::String | ParamKind::QuotedString => ParamValue::Str(token.to_vec()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Byte(b) => serializer.serialize_u8(*b),
            ParamValue::Int(n) => serializer.serialize_i32(*n),
            ParamValue::Float(f) => serializer.serialize_f32(*f),
            ParamValue::Str(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

/// Boolean: `ok`, `on`, `true`, `y`, `yes` (any case) or a non-zero number
pub fn parse_bool(token: &[u8]) -> bool {
    let Some(first) = token.first().map(u8::to_ascii_lowercase) else {
        return false;
    };

    match first {
        b'o' => token.len() == 2 && matches!(token[1].to_ascii_lowercase(), b'k' | b'n'),
        b't' => token.eq_ignore_ascii_case(b"true"),
        b'y' => token.len() == 1 || token.eq_ignore_ascii_case(b"yes"),
        _ => token.iter().all(u8::is_ascii_digit) && token.iter().any(|&b| b != b'0'),
    }
}

/// First raw byte of the token
pub fn parse_byte(token: &[u8]) -> u8 {
    token.first().copied().unwrap_or(0)
}

/// Integer with C `atoi` rules: optional whitespace and sign, then digits up
/// to the first non-digit. Wraps on overflow.
pub fn parse_int(token: &[u8]) -> i32 {
    let mut rest = skip_space(token);
    let mut negative = false;

    if let Some((&sign, tail)) = rest.split_first() {
        if sign == b'-' || sign == b'+' {
            negative = sign == b'-';
            rest = tail;
        }
    }

    let value = rest
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i32, |acc, &b| acc.wrapping_mul(10).wrapping_add(i32::from(b - b'0')));

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Float from the longest valid `strtod`-style prefix, 0.0 if there is none
pub fn parse_float(token: &[u8]) -> f32 {
    let text = skip_space(token);
    let len = float_prefix_len(text);

    std::str::from_utf8(&text[..len])
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(0.0)
}

fn skip_space(token: &[u8]) -> &[u8] {
    let start = token
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c))
        .unwrap_or(token.len());
    &token[start..]
}

fn float_prefix_len(text: &[u8]) -> usize {
    let digits = |from: usize| text[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut pos = 0;
    if matches!(text.first(), Some(b'+' | b'-')) {
        pos = 1;
    }

    for word in [&b"infinity"[..], &b"inf"[..], &b"nan"[..]] {
        let end = pos + word.len();
        if text.len() >= end && text[pos..end].eq_ignore_ascii_case(word) {
            return end;
        }
    }

    let int_digits = digits(pos);
    pos += int_digits;

    let mut frac_digits = 0;
    if text.get(pos) == Some(&b'.') {
        frac_digits = digits(pos + 1);
        if int_digits + frac_digits > 0 {
            pos += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return 0;
    }

    // exponent only counts when at least one digit follows
    if matches!(text.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(text.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            pos = exp + exp_digits;
        }
    }

    pos
}
