//! Default rule predicates.
//!
//! Every predicate takes the field's current [`Value`] and the rule argument
//! (`""` when the tag term has none). A value of the wrong kind or an argument
//! that does not parse is a validation failure, never an error.
//!
//! `min` and `max` parse their bound as an unsigned integer, so negative
//! bounds cannot be expressed; a tag like `min=-5` always fails.

use crate::reflect::Value;
use once_cell::sync::Lazy;
use regex::Regex;

/// Email shape: local part, `@`, one or more dotted labels with a 2+ letter TLD.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z]{2,})+$",
    )
    .expect("email regex should be valid")
});

/// Canonical 8-4-4-4-12 UUID, versions 1-5, RFC 4122 variant.
static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("UUID regex should be valid")
});

/// Fails only for an absent or empty nil-able value: `None`, an empty
/// collection or an empty byte vector. Scalars and strings always pass.
pub fn request(value: &Value<'_>, _arg: &str) -> bool {
    match value {
        Value::Nil => false,
        Value::Seq(len) | Value::Map(len) => *len != 0,
        Value::Bytes(bytes) => !bytes.is_empty(),
        _ => true,
    }
}

fn char_len(s: &str) -> u64 {
    s.chars().count() as u64
}

/// Integer `>= arg`, or string length `>= arg`.
pub fn min(value: &Value<'_>, arg: &str) -> bool {
    let Ok(bound) = arg.parse::<u64>() else {
        return false;
    };
    match value {
        Value::Int(v) => i128::from(*v) >= i128::from(bound),
        Value::Uint(v) => *v >= bound,
        Value::Str(s) => char_len(s) >= bound,
        _ => false,
    }
}

/// Integer `<= arg`, or string length `<= arg`.
pub fn max(value: &Value<'_>, arg: &str) -> bool {
    let Ok(bound) = arg.parse::<u64>() else {
        return false;
    };
    match value {
        Value::Int(v) => i128::from(*v) <= i128::from(bound),
        Value::Uint(v) => *v <= bound,
        Value::Str(s) => char_len(s) <= bound,
        _ => false,
    }
}

pub fn email(value: &Value<'_>, _arg: &str) -> bool {
    matches!(value, Value::Str(s) if EMAIL_REGEX.is_match(s))
}

pub fn uuid(value: &Value<'_>, _arg: &str) -> bool {
    matches!(value, Value::Str(s) if UUID_REGEX.is_match(s))
}

/// String length (in characters) exactly equal to `arg`.
pub fn fixed(value: &Value<'_>, arg: &str) -> bool {
    let Ok(want) = arg.parse::<i64>() else {
        return false;
    };
    match value {
        Value::Str(s) => i64::try_from(s.chars().count()).is_ok_and(|len| len == want),
        _ => false,
    }
}
